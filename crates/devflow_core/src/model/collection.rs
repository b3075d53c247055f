//! Saved-question bookmark model.
//!
//! # Invariants
//! - At most one collection row exists per `(author_id, question_id)`.
//! - `question_id` may dangle after the question is removed; read paths drop
//!   such bookmarks.

use super::question::QuestionId;
use super::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CollectionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub author_id: UserId,
    pub question_id: QuestionId,
    pub created_at: i64,
}

impl Collection {
    pub fn new(author_id: UserId, question_id: QuestionId) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            question_id,
            created_at: super::now_epoch_ms(),
        }
    }
}
