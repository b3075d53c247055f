//! Counter store: atomic adjustment of denormalized counters.
//!
//! # Responsibility
//! - Apply signed deltas to question/answer counter columns.
//! - Recompute counters from their underlying vote and answer records.
//!
//! # Invariants
//! - Every adjustment is one `UPDATE ... SET c = c + ? ... RETURNING`
//!   statement; there is no read-then-write window for lost updates.
//! - No clamping: callers are responsible for issuing balanced deltas.
//! - Statements run inside whatever transaction the borrowed connection is in.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::question::QuestionId;
use crate::model::vote::{CounterField, VoteTarget};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// Counter values of one entity after an adjustment or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSnapshot {
    Question {
        id: QuestionId,
        answers: i64,
        upvotes: i64,
        downvotes: i64,
        views: i64,
    },
    Answer {
        id: Uuid,
        question_id: QuestionId,
        upvotes: i64,
        downvotes: i64,
    },
}

impl CounterSnapshot {
    pub fn upvotes(&self) -> i64 {
        match self {
            Self::Question { upvotes, .. } | Self::Answer { upvotes, .. } => *upvotes,
        }
    }

    pub fn downvotes(&self) -> i64 {
        match self {
            Self::Question { downvotes, .. } | Self::Answer { downvotes, .. } => *downvotes,
        }
    }

    /// Question whose page renders this entity.
    pub fn page_question_id(&self) -> QuestionId {
        match self {
            Self::Question { id, .. } => *id,
            Self::Answer { question_id, .. } => *question_id,
        }
    }

    pub fn value(&self, field: CounterField) -> Option<i64> {
        match (self, field) {
            (_, CounterField::Upvotes) => Some(self.upvotes()),
            (_, CounterField::Downvotes) => Some(self.downvotes()),
            (Self::Question { answers, .. }, CounterField::Answers) => Some(*answers),
            (Self::Question { views, .. }, CounterField::Views) => Some(*views),
            (Self::Answer { .. }, _) => None,
        }
    }
}

/// One entity whose cached counters disagree with its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDrift {
    pub target: VoteTarget,
    pub field: CounterField,
    pub cached: i64,
    pub actual: i64,
}

/// Repository interface for counter maintenance.
pub trait CounterStore {
    /// Applies `delta` to `field` of `target` atomically and returns the
    /// updated counters.
    fn adjust_counter(
        &self,
        target: VoteTarget,
        field: CounterField,
        delta: i64,
    ) -> RepoResult<CounterSnapshot>;
    /// Reads current counters, `None` when the entity does not exist.
    fn read_counters(&self, target: VoteTarget) -> RepoResult<Option<CounterSnapshot>>;
    /// Lists counters that differ from a recount of underlying records.
    fn find_drift(&self) -> RepoResult<Vec<CounterDrift>>;
    /// Overwrites one counter with a recomputed value.
    fn set_counter(&self, target: VoteTarget, field: CounterField, value: i64) -> RepoResult<()>;
}

/// SQLite-backed counter store.
pub struct SqliteCounterStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCounterStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CounterStore for SqliteCounterStore<'_> {
    fn adjust_counter(
        &self,
        target: VoteTarget,
        field: CounterField,
        delta: i64,
    ) -> RepoResult<CounterSnapshot> {
        ensure_supported(target, field)?;
        let column = field.column();
        let sql = format!(
            "UPDATE {table}
             SET {column} = {column} + ?1
             WHERE id = ?2
             RETURNING {returning};",
            table = target.table(),
            returning = returning_columns(target),
        );

        self.conn
            .query_row(&sql, params![delta, target.id().to_string()], |row| {
                Ok(parse_snapshot(target, row))
            })
            .optional()?
            .ok_or_else(|| not_found(target))?
    }

    fn read_counters(&self, target: VoteTarget) -> RepoResult<Option<CounterSnapshot>> {
        let sql = format!(
            "SELECT {returning} FROM {table} WHERE id = ?1;",
            returning = returning_columns(target),
            table = target.table(),
        );
        let snapshot = self
            .conn
            .query_row(&sql, [target.id().to_string()], |row| {
                Ok(parse_snapshot(target, row))
            })
            .optional()?;
        snapshot.transpose()
    }

    fn find_drift(&self) -> RepoResult<Vec<CounterDrift>> {
        let mut drift = Vec::new();

        let mut stmt = self.conn.prepare(
            "SELECT
                q.id,
                q.answers,
                (SELECT COUNT(*) FROM answers a WHERE a.question_id = q.id) AS actual_answers,
                q.upvotes,
                (SELECT COUNT(*) FROM votes v
                  WHERE v.target_kind = 'question' AND v.target_id = q.id
                    AND v.vote_kind = 'upvote') AS actual_upvotes,
                q.downvotes,
                (SELECT COUNT(*) FROM votes v
                  WHERE v.target_kind = 'question' AND v.target_id = q.id
                    AND v.vote_kind = 'downvote') AS actual_downvotes
             FROM questions q
             ORDER BY q.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let target = VoteTarget::Question(parse_uuid(&id_text, "questions.id")?);
            push_drift(&mut drift, target, CounterField::Answers, row, "answers", "actual_answers")?;
            push_drift(&mut drift, target, CounterField::Upvotes, row, "upvotes", "actual_upvotes")?;
            push_drift(
                &mut drift,
                target,
                CounterField::Downvotes,
                row,
                "downvotes",
                "actual_downvotes",
            )?;
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                a.id,
                a.upvotes,
                (SELECT COUNT(*) FROM votes v
                  WHERE v.target_kind = 'answer' AND v.target_id = a.id
                    AND v.vote_kind = 'upvote') AS actual_upvotes,
                a.downvotes,
                (SELECT COUNT(*) FROM votes v
                  WHERE v.target_kind = 'answer' AND v.target_id = a.id
                    AND v.vote_kind = 'downvote') AS actual_downvotes
             FROM answers a
             ORDER BY a.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let target = VoteTarget::Answer(parse_uuid(&id_text, "answers.id")?);
            push_drift(&mut drift, target, CounterField::Upvotes, row, "upvotes", "actual_upvotes")?;
            push_drift(
                &mut drift,
                target,
                CounterField::Downvotes,
                row,
                "downvotes",
                "actual_downvotes",
            )?;
        }

        Ok(drift)
    }

    fn set_counter(&self, target: VoteTarget, field: CounterField, value: i64) -> RepoResult<()> {
        ensure_supported(target, field)?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE {table} SET {column} = ?1 WHERE id = ?2;",
                table = target.table(),
                column = field.column(),
            ),
            params![value, target.id().to_string()],
        )?;
        if changed == 0 {
            return Err(not_found(target));
        }
        Ok(())
    }
}

fn ensure_supported(target: VoteTarget, field: CounterField) -> RepoResult<()> {
    if target.supports(field) {
        Ok(())
    } else {
        Err(RepoError::InvalidCounter {
            entity: target.kind().as_str(),
            field: field.column(),
        })
    }
}

fn not_found(target: VoteTarget) -> RepoError {
    RepoError::NotFound {
        entity: target.kind().as_str(),
        id: target.id(),
    }
}

fn returning_columns(target: VoteTarget) -> &'static str {
    match target {
        VoteTarget::Question(_) => "id, answers, upvotes, downvotes, views",
        VoteTarget::Answer(_) => "id, question_id, upvotes, downvotes",
    }
}

fn parse_snapshot(target: VoteTarget, row: &Row<'_>) -> RepoResult<CounterSnapshot> {
    let snapshot = match target {
        VoteTarget::Question(id) => CounterSnapshot::Question {
            id,
            answers: row.get("answers")?,
            upvotes: row.get("upvotes")?,
            downvotes: row.get("downvotes")?,
            views: row.get("views")?,
        },
        VoteTarget::Answer(id) => {
            let question_text: String = row.get("question_id")?;
            CounterSnapshot::Answer {
                id,
                question_id: parse_uuid(&question_text, "answers.question_id")?,
                upvotes: row.get("upvotes")?,
                downvotes: row.get("downvotes")?,
            }
        }
    };
    Ok(snapshot)
}

fn push_drift(
    drift: &mut Vec<CounterDrift>,
    target: VoteTarget,
    field: CounterField,
    row: &Row<'_>,
    cached_column: &str,
    actual_column: &str,
) -> RepoResult<()> {
    let cached: i64 = row.get(cached_column)?;
    let actual: i64 = row.get(actual_column)?;
    if cached != actual {
        drift.push(CounterDrift {
            target,
            field,
            cached,
            actual,
        });
    }
    Ok(())
}
