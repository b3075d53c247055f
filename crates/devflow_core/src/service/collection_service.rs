//! Saved-question use-cases.
//!
//! # Responsibility
//! - Toggle a question in or out of the requester's saved collection.
//! - Serve the joined, filtered and paginated saved-questions view.
//!
//! # Invariants
//! - Toggling twice returns the collection to its original state.
//! - The view's count pass and page pass read one consistent snapshot.

use super::ServiceContext;
use crate::auth::RequestContext;
use crate::db::run_in_transaction;
use crate::error::{CoreError, CoreResult};
use crate::invalidation::Invalidation;
use crate::model::collection::Collection;
use crate::model::question::QuestionId;
use crate::query::saved_questions::{SavedQuestionsPage, SavedQuestionsQuery};
use crate::repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
use crate::repo::lookup_repo::SqliteLookupSource;
use crate::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use crate::validation::SavedQuestionsRequest;
use log::info;
use rusqlite::Connection;
use serde::Serialize;

/// Saved state of one question for the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveStatus {
    pub saved: bool,
}

/// Saved-question facade.
pub struct CollectionService {
    ctx: ServiceContext,
}

impl CollectionService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Saves `question_id` when unsaved, unsaves it otherwise.
    ///
    /// # Errors
    /// - `Unauthorized` without a session.
    /// - `NotFound` when the question does not exist.
    pub fn toggle_save_question(
        &self,
        conn: &mut Connection,
        request: &RequestContext,
        question_id: QuestionId,
    ) -> CoreResult<SaveStatus> {
        let author_id = self.ctx.authorize(request)?;

        let status = run_in_transaction(conn, self.ctx.tx_policy(), "toggle_save_question", |tx| {
            if !SqliteQuestionRepository::new(tx).question_exists(question_id)? {
                return Err(CoreError::not_found("question", question_id));
            }

            let collections = SqliteCollectionRepository::new(tx);
            match collections.find_collection(author_id, question_id)? {
                Some(existing) => {
                    collections.delete_collection(existing.id)?;
                    Ok(SaveStatus { saved: false })
                }
                None => {
                    collections.insert_collection(&Collection::new(author_id, question_id))?;
                    Ok(SaveStatus { saved: true })
                }
            }
        })?;

        info!(
            "event=collection_toggle module=service status=ok question_id={} saved={}",
            question_id, status.saved
        );
        self.ctx.emit([Invalidation::QuestionPage(question_id)]);
        Ok(status)
    }

    pub fn has_saved_question(
        &self,
        conn: &Connection,
        request: &RequestContext,
        question_id: QuestionId,
    ) -> CoreResult<SaveStatus> {
        let author_id = self.ctx.authorize(request)?;
        let saved = SqliteCollectionRepository::new(conn)
            .find_collection(author_id, question_id)?
            .is_some();
        Ok(SaveStatus { saved })
    }

    /// Runs the saved-questions view for the requester.
    pub fn get_saved_questions(
        &self,
        conn: &Connection,
        request: &RequestContext,
        params: SavedQuestionsRequest,
    ) -> CoreResult<SavedQuestionsPage> {
        let owner = self.ctx.authorize(request)?;
        let query = SavedQuestionsQuery {
            owner,
            text: params.text,
            sort: params.sort,
            page: params.page,
        };

        let tx = conn.unchecked_transaction()?;
        let page = query.run(&SqliteLookupSource::new(&tx))?;
        tx.finish()?;
        Ok(page)
    }
}
