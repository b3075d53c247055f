//! Authoring use-cases for users and questions.
//!
//! # Responsibility
//! - Create users and tagged questions the vote and answer flows act on.
//! - Resolve a question with its author and tags.
//! - Count question views through the counter store.
//!
//! # Invariants
//! - A question and its tag links are written in one transaction.
//! - New questions start with every counter at zero.

use super::ServiceContext;
use crate::auth::RequestContext;
use crate::db::run_in_transaction;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::model::question::{Question, QuestionId};
use crate::model::user::User;
use crate::model::vote::{CounterField, VoteTarget};
use crate::query::pipeline::QuestionView;
use crate::repo::counter_repo::{CounterStore, SqliteCounterStore};
use crate::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::validation::QuestionDraft;
use log::info;
use rusqlite::Connection;

/// Authoring facade.
pub struct QuestionService {
    ctx: ServiceContext,
}

impl QuestionService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn create_user(
        &self,
        conn: &Connection,
        name: &str,
        image: Option<&str>,
    ) -> CoreResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::field("name", "name is required").into());
        }
        let mut user = User::new(name);
        user.image = image.map(str::to_string);
        SqliteUserRepository::new(conn).create_user(&user)?;
        info!("event=user_create module=service status=ok user_id={}", user.id);
        Ok(user)
    }

    /// Creates a question authored by the requester.
    pub fn create_question(
        &self,
        conn: &mut Connection,
        request: &RequestContext,
        draft: &QuestionDraft,
    ) -> CoreResult<QuestionView> {
        let author_id = self.ctx.authorize(request)?;

        let question = run_in_transaction(conn, self.ctx.tx_policy(), "create_question", |tx| {
            if SqliteUserRepository::new(tx).get_user(author_id)?.is_none() {
                return Err(CoreError::not_found("user", author_id));
            }
            let question = Question::new(author_id, draft.title.as_str(), draft.content.as_str());
            Ok(SqliteQuestionRepository::new(tx).create_question(&question, &draft.tags)?)
        })?;

        info!(
            "event=question_create module=service status=ok question_id={} tag_count={}",
            question.id,
            question.tag_ids.len()
        );
        self.get_question(conn, question.id)
    }

    /// Loads a question with its author summary and ordered tags.
    pub fn get_question(&self, conn: &Connection, id: QuestionId) -> CoreResult<QuestionView> {
        let questions = SqliteQuestionRepository::new(conn);
        let question = questions
            .get_question(id)?
            .ok_or_else(|| CoreError::not_found("question", id))?;
        let author = SqliteUserRepository::new(conn)
            .get_user(question.author_id)?
            .ok_or_else(|| CoreError::not_found("user", question.author_id))?
            .summary();
        let tags_by_id = questions.get_tags(&question.tag_ids)?;
        let tags = question
            .tag_ids
            .iter()
            .filter_map(|tag_id| tags_by_id.get(tag_id).cloned())
            .collect();
        Ok(QuestionView::assemble(question, author, tags))
    }

    /// Increments the question's `views` counter and returns the new value.
    pub fn record_view(&self, conn: &Connection, id: QuestionId) -> CoreResult<i64> {
        let snapshot = SqliteCounterStore::new(conn).adjust_counter(
            VoteTarget::Question(id),
            CounterField::Views,
            1,
        )?;
        Ok(snapshot.value(CounterField::Views).unwrap_or_default())
    }
}
