//! Question and tag domain models.
//!
//! # Invariants
//! - `answers`, `upvotes`, `downvotes` and `views` are cached projections of
//!   underlying records and start at zero.
//! - Tag names are lowercase and unique.

use super::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type QuestionId = Uuid;
pub type TagId = Uuid;

/// Canonical question record with its denormalized counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    /// Tag references; resolved to `Tag` records by read paths.
    pub tag_ids: Vec<TagId>,
    pub answers: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub views: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Question {
    /// Creates a question with zeroed counters and no tags.
    pub fn new(author_id: UserId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            title: title.into(),
            content: content.into(),
            tag_ids: Vec::new(),
            answers: 0,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            created_at: super::now_epoch_ms(),
        }
    }
}

/// Tag record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}
