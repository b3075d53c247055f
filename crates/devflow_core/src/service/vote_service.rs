//! Vote engine use-cases.
//!
//! # Responsibility
//! - Execute the per-(voter, target) vote state machine.
//! - Propagate every transition into the target's cached counters.
//!
//! # Invariants
//! - The vote record change and all counter deltas commit together or not
//!   at all.
//! - A switch decrements the previous counter before incrementing the new one.
//! - Repeating the same vote kind retracts it, netting the counter to zero.

use super::ServiceContext;
use crate::auth::RequestContext;
use crate::db::run_in_transaction;
use crate::error::{CoreError, CoreResult};
use crate::invalidation::Invalidation;
use crate::model::vote::{Vote, VoteKind, VoteState, VoteStatus, VoteTarget, VoteTransition};
use crate::repo::counter_repo::{CounterSnapshot, CounterStore, SqliteCounterStore};
use crate::repo::vote_repo::{SqliteVoteRepository, VoteRepository};
use log::info;
use rusqlite::Connection;

/// Result of one `cast_vote` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub transition: VoteTransition,
    /// Voter state after the transition.
    pub status: VoteStatus,
    /// Target counters after all deltas were applied.
    pub counters: CounterSnapshot,
}

/// Vote engine facade.
pub struct VoteService {
    ctx: ServiceContext,
}

impl VoteService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Casts, retracts or switches the requester's vote on `target`.
    ///
    /// # Errors
    /// - `Unauthorized` without a session.
    /// - `NotFound` when `target` does not exist.
    /// - `TransactionConflict` when contention outlasts the retry policy.
    pub fn cast_vote(
        &self,
        conn: &mut Connection,
        request: &RequestContext,
        target: VoteTarget,
        kind: VoteKind,
    ) -> CoreResult<VoteOutcome> {
        let voter_id = self.ctx.authorize(request)?;

        let outcome = run_in_transaction(conn, self.ctx.tx_policy(), "cast_vote", |tx| {
            let counters = SqliteCounterStore::new(tx);
            let votes = SqliteVoteRepository::new(tx);

            let mut snapshot = counters
                .read_counters(target)?
                .ok_or_else(|| CoreError::not_found(target.kind().as_str(), target.id()))?;
            let existing = votes.find_vote(voter_id, target)?;
            let transition = VoteState::from_vote(existing.as_ref()).transition(kind);

            match (transition, existing) {
                (VoteTransition::Cast(kind), None) => {
                    votes.insert_vote(&Vote::new(voter_id, target, kind))?;
                }
                (VoteTransition::Retract(_), Some(vote)) => votes.delete_vote(vote.id)?,
                (VoteTransition::Switch { to, .. }, Some(vote)) => {
                    votes.update_vote_kind(vote.id, to)?
                }
                (transition, _) => {
                    return Err(CoreError::Internal(format!(
                        "vote record disagrees with `{}` transition",
                        transition.name()
                    )))
                }
            }

            for (field, delta) in transition.counter_deltas() {
                snapshot = counters.adjust_counter(target, field, delta)?;
            }

            Ok(VoteOutcome {
                transition,
                status: VoteStatus::from(transition.resulting_state()),
                counters: snapshot,
            })
        })?;

        info!(
            "event=vote_cast module=service status=ok target_kind={} transition={}",
            target.kind().as_str(),
            outcome.transition.name()
        );
        self.ctx.emit([Invalidation::QuestionPage(
            outcome.counters.page_question_id(),
        )]);
        Ok(outcome)
    }

    /// Reports the requester's current vote on `target`.
    pub fn has_voted(
        &self,
        conn: &Connection,
        request: &RequestContext,
        target: VoteTarget,
    ) -> CoreResult<VoteStatus> {
        let voter_id = self.ctx.authorize(request)?;
        let existing = SqliteVoteRepository::new(conn).find_vote(voter_id, target)?;
        Ok(VoteStatus::from(VoteState::from_vote(existing.as_ref())))
    }
}
