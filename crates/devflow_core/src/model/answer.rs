//! Answer domain model.

use super::question::QuestionId;
use super::user::{UserId, UserSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AnswerId = Uuid;

/// Answer to one question, owning its own vote counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub author_id: UserId,
    pub question_id: QuestionId,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Answer {
    pub fn new(author_id: UserId, question_id: QuestionId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            question_id,
            content: content.into(),
            upvotes: 0,
            downvotes: 0,
            created_at: super::now_epoch_ms(),
        }
    }
}

/// Answer joined with its author summary for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerView {
    pub answer: Answer,
    pub author: UserSummary,
}
