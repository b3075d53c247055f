//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from service/transaction orchestration.
//!
//! # Invariants
//! - Repositories borrow a `Connection`; passing a `Transaction` scopes every
//!   call to that transaction.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Counter columns are only written by `counter_repo`.

use crate::db::DbError;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod answer_repo;
pub mod collection_repo;
pub mod counter_repo;
pub mod lookup_repo;
pub mod question_repo;
pub mod user_repo;
pub mod vote_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error shared by all repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    /// Counter field does not exist on the addressed entity.
    InvalidCounter {
        entity: &'static str,
        field: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidCounter { entity, field } => {
                write!(f, "{entity} has no `{field}` counter")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidCounter { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// Largest number of ids bound into one `IN (...)` list.
pub const MAX_IN_PARAMS: usize = 500;

/// Runs the statement built by `sql` once per chunk of `ids`, handing every
/// row to `on_row`. `sql` receives the placeholder list for the chunk.
pub(crate) fn for_each_row_in(
    conn: &Connection,
    ids: &[Uuid],
    sql: impl Fn(&str) -> String,
    mut on_row: impl FnMut(&Row<'_>) -> RepoResult<()>,
) -> RepoResult<()> {
    for chunk in ids.chunks(MAX_IN_PARAMS) {
        let mut stmt = conn.prepare_cached(&sql(&placeholders(chunk.len())))?;
        let mut rows = stmt.query(params_from_iter(chunk.iter().map(|id| id.to_string())))?;
        while let Some(row) = rows.next()? {
            on_row(row)?;
        }
    }
    Ok(())
}

/// Builds `?1, ?2, ...` placeholders for an `IN (...)` list.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{parse_uuid, placeholders, RepoError};

    #[test]
    fn placeholders_are_numbered_from_one() {
        assert_eq!(placeholders(3), "?1, ?2, ?3");
        assert_eq!(placeholders(0), "");
    }

    #[test]
    fn parse_uuid_reports_column_on_failure() {
        let err = parse_uuid("nope", "votes.target_id").unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("votes.target_id")));
    }
}
