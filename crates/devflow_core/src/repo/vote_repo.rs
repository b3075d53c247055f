//! Vote record repository.
//!
//! # Responsibility
//! - Load, insert, re-kind and delete the single vote of a `(voter, target)`.
//! - Cascade-delete every vote referencing a removed target.
//!
//! # Invariants
//! - At most one vote exists per `(voter_id, target_id, target_kind)`; the
//!   unique index turns a racing duplicate insert into a retryable conflict.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::user::UserId;
use crate::model::vote::{TargetKind, Vote, VoteId, VoteKind, VoteTarget};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for vote records.
pub trait VoteRepository {
    fn find_vote(&self, voter_id: UserId, target: VoteTarget) -> RepoResult<Option<Vote>>;
    fn insert_vote(&self, vote: &Vote) -> RepoResult<VoteId>;
    fn update_vote_kind(&self, id: VoteId, kind: VoteKind) -> RepoResult<()>;
    fn delete_vote(&self, id: VoteId) -> RepoResult<()>;
    /// Deletes all votes on `target` and returns how many were removed.
    fn delete_votes_for_target(&self, target: VoteTarget) -> RepoResult<usize>;
    fn count_votes_for_target(&self, target: VoteTarget) -> RepoResult<u64>;
}

/// SQLite-backed vote repository.
pub struct SqliteVoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVoteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VoteRepository for SqliteVoteRepository<'_> {
    fn find_vote(&self, voter_id: UserId, target: VoteTarget) -> RepoResult<Option<Vote>> {
        let vote = self
            .conn
            .query_row(
                "SELECT id, voter_id, target_id, target_kind, vote_kind, created_at
                 FROM votes
                 WHERE voter_id = ?1
                   AND target_id = ?2
                   AND target_kind = ?3;",
                params![
                    voter_id.to_string(),
                    target.id().to_string(),
                    target.kind().as_str(),
                ],
                |row| Ok(parse_vote_row(row)),
            )
            .optional()?;
        vote.transpose()
    }

    fn insert_vote(&self, vote: &Vote) -> RepoResult<VoteId> {
        self.conn.execute(
            "INSERT INTO votes (id, voter_id, target_id, target_kind, vote_kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                vote.id.to_string(),
                vote.voter_id.to_string(),
                vote.target.id().to_string(),
                vote.target.kind().as_str(),
                vote.kind.as_str(),
                vote.created_at,
            ],
        )?;
        Ok(vote.id)
    }

    fn update_vote_kind(&self, id: VoteId, kind: VoteKind) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE votes SET vote_kind = ?2 WHERE id = ?1;",
            params![id.to_string(), kind.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "vote", id });
        }
        Ok(())
    }

    fn delete_vote(&self, id: VoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM votes WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "vote", id });
        }
        Ok(())
    }

    fn delete_votes_for_target(&self, target: VoteTarget) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM votes WHERE target_id = ?1 AND target_kind = ?2;",
            params![target.id().to_string(), target.kind().as_str()],
        )?;
        Ok(removed)
    }

    fn count_votes_for_target(&self, target: VoteTarget) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE target_id = ?1 AND target_kind = ?2;",
            params![target.id().to_string(), target.kind().as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn parse_vote_row(row: &Row<'_>) -> RepoResult<Vote> {
    let id_text: String = row.get("id")?;
    let voter_text: String = row.get("voter_id")?;
    let target_text: String = row.get("target_id")?;

    let target_kind_text: String = row.get("target_kind")?;
    let target_kind = TargetKind::parse(&target_kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid target kind `{target_kind_text}` in votes.target_kind"
        ))
    })?;

    let vote_kind_text: String = row.get("vote_kind")?;
    let kind = VoteKind::parse(&vote_kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid vote kind `{vote_kind_text}` in votes.vote_kind"
        ))
    })?;

    Ok(Vote {
        id: parse_uuid(&id_text, "votes.id")?,
        voter_id: parse_uuid(&voter_text, "votes.voter_id")?,
        target: VoteTarget::from_parts(target_kind, parse_uuid(&target_text, "votes.target_id")?),
        kind,
        created_at: row.get("created_at")?,
    })
}
