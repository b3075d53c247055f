//! Answer lifecycle use-cases.
//!
//! # Responsibility
//! - Create answers while keeping the parent question's `answers` counter
//!   in step.
//! - Delete answers together with every vote that referenced them.
//! - Serve paginated answer listings with author summaries.
//!
//! # Invariants
//! - `create_answer` followed by `delete_answer` restores the question's
//!   `answers` counter and leaves no vote referencing the deleted answer.
//! - Only the answer's author may delete it.

use super::ServiceContext;
use crate::auth::RequestContext;
use crate::db::run_in_transaction;
use crate::error::{CoreError, CoreResult};
use crate::invalidation::Invalidation;
use crate::model::answer::{Answer, AnswerId, AnswerView};
use crate::model::question::QuestionId;
use crate::model::vote::{CounterField, VoteTarget};
use crate::repo::answer_repo::{AnswerRepository, SqliteAnswerRepository};
use crate::repo::counter_repo::{CounterStore, SqliteCounterStore};
use crate::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use crate::repo::vote_repo::{SqliteVoteRepository, VoteRepository};
use crate::validation::AnswersRequest;
use log::info;
use rusqlite::Connection;
use serde::Serialize;

/// One page of answers of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswersPage {
    pub items: Vec<AnswerView>,
    pub total_count: u64,
    pub has_next: bool,
}

/// Answer lifecycle facade.
pub struct AnswerService {
    ctx: ServiceContext,
}

impl AnswerService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Creates an answer and increments the question's `answers` counter.
    ///
    /// `content` is expected to have passed the validation gate.
    ///
    /// # Errors
    /// - `Unauthorized` without a session.
    /// - `NotFound` when the question does not exist.
    pub fn create_answer(
        &self,
        conn: &mut Connection,
        request: &RequestContext,
        question_id: QuestionId,
        content: &str,
    ) -> CoreResult<Answer> {
        let author_id = self.ctx.authorize(request)?;

        let answer = run_in_transaction(conn, self.ctx.tx_policy(), "create_answer", |tx| {
            if !SqliteQuestionRepository::new(tx).question_exists(question_id)? {
                return Err(CoreError::not_found("question", question_id));
            }

            let answer = Answer::new(author_id, question_id, content);
            SqliteAnswerRepository::new(tx).insert_answer(&answer)?;
            SqliteCounterStore::new(tx).adjust_counter(
                VoteTarget::Question(question_id),
                CounterField::Answers,
                1,
            )?;
            Ok(answer)
        })?;

        info!(
            "event=answer_create module=service status=ok answer_id={} question_id={}",
            answer.id, question_id
        );
        self.ctx.emit([Invalidation::QuestionPage(question_id)]);
        Ok(answer)
    }

    /// Deletes an answer authored by the requester, cascading its votes.
    ///
    /// # Errors
    /// - `Unauthorized` without a session or when the requester is not the
    ///   answer's author.
    /// - `NotFound` when the answer does not exist.
    pub fn delete_answer(
        &self,
        conn: &mut Connection,
        request: &RequestContext,
        answer_id: AnswerId,
    ) -> CoreResult<Answer> {
        let requester_id = self.ctx.authorize(request)?;

        let (answer, removed_votes) =
            run_in_transaction(conn, self.ctx.tx_policy(), "delete_answer", |tx| {
                let answers = SqliteAnswerRepository::new(tx);
                let answer = answers
                    .get_answer(answer_id)?
                    .ok_or_else(|| CoreError::not_found("answer", answer_id))?;
                if answer.author_id != requester_id {
                    return Err(CoreError::Unauthorized(
                        "only the author may delete this answer".to_string(),
                    ));
                }

                SqliteCounterStore::new(tx).adjust_counter(
                    VoteTarget::Question(answer.question_id),
                    CounterField::Answers,
                    -1,
                )?;
                let removed_votes = SqliteVoteRepository::new(tx)
                    .delete_votes_for_target(VoteTarget::Answer(answer_id))?;
                answers.delete_answer(answer_id)?;
                Ok((answer, removed_votes))
            })?;

        info!(
            "event=answer_delete module=service status=ok answer_id={} question_id={} removed_votes={}",
            answer.id, answer.question_id, removed_votes
        );
        self.ctx.emit([
            Invalidation::QuestionPage(answer.question_id),
            Invalidation::ProfilePage(requester_id),
        ]);
        Ok(answer)
    }

    /// Lists one page of a question's answers. Count and page are read in
    /// one snapshot.
    pub fn get_answers(&self, conn: &Connection, request: &AnswersRequest) -> CoreResult<AnswersPage> {
        let tx = conn.unchecked_transaction()?;
        let answers = SqliteAnswerRepository::new(&tx);
        let total_count = answers.count_answers(request.question_id)?;
        let items = answers.list_answers(
            request.question_id,
            request.sort,
            request.page.skip(),
            u64::from(request.page.page_size),
        )?;
        tx.finish()?;

        let has_next = request.page.has_next(total_count, items.len());
        Ok(AnswersPage {
            items,
            total_count,
            has_next,
        })
    }
}
