//! SQLite keyed-lookup source for read pipelines.
//!
//! Each lookup is one `IN (...)` fetch; joins are assembled by the pipeline.

use super::collection_repo::{CollectionRepository, SqliteCollectionRepository};
use super::question_repo::{QuestionRepository, SqliteQuestionRepository};
use super::user_repo::{SqliteUserRepository, UserRepository};
use super::RepoResult;
use crate::model::collection::Collection;
use crate::model::question::{Question, QuestionId, Tag, TagId};
use crate::model::user::{UserId, UserSummary};
use crate::query::pipeline::LookupSource;
use rusqlite::Connection;
use std::collections::HashMap;

pub struct SqliteLookupSource<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLookupSource<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LookupSource for SqliteLookupSource<'_> {
    fn collections_by_author(&self, author_id: UserId) -> RepoResult<Vec<Collection>> {
        SqliteCollectionRepository::new(self.conn).list_collections_by_author(author_id)
    }

    fn questions_by_id(&self, ids: &[QuestionId]) -> RepoResult<HashMap<QuestionId, Question>> {
        SqliteQuestionRepository::new(self.conn).get_questions(ids)
    }

    fn authors_by_id(&self, ids: &[UserId]) -> RepoResult<HashMap<UserId, UserSummary>> {
        SqliteUserRepository::new(self.conn).get_user_summaries(ids)
    }

    fn tags_by_id(&self, ids: &[TagId]) -> RepoResult<HashMap<TagId, Tag>> {
        SqliteQuestionRepository::new(self.conn).get_tags(ids)
    }
}
