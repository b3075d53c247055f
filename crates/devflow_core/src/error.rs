//! Core error taxonomy.
//!
//! # Responsibility
//! - Define the closed set of failure kinds every core operation returns.
//! - Map persistence-layer errors into that taxonomy at the service boundary.
//!
//! # Invariants
//! - `TransactionConflict` is the only retryable kind.
//! - `Internal` keeps driver detail for logs but never exposes it through
//!   `public_message()`.

use crate::db::DbError;
use crate::repo::RepoError;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Field-level validation failure produced by the schema gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// Field name -> human-readable problem.
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    /// Creates an error with a single failing field.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = Self::default();
        error.push(name, message);
        error
    }

    /// Records one failing field, keeping the first message per field.
    pub fn push(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(name.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `Ok(())` when no field failed, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let details = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "validation failed ({details})")
    }
}

impl Error for ValidationError {}

/// Failure kinds surfaced by core operations.
#[derive(Debug)]
pub enum CoreError {
    /// Referenced entity does not exist.
    NotFound { entity: &'static str, id: String },
    /// Actor is missing or lacks rights over the target.
    Unauthorized(String),
    /// Malformed input with field-level detail.
    Validation(ValidationError),
    /// Retryable contention or transaction timeout.
    TransactionConflict(String),
    /// Unexpected store failure.
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether callers should retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict(_))
    }

    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Validation(_) => "validation_error",
            Self::TransactionConflict(_) => "transaction_conflict",
            Self::Internal(_) => "internal",
        }
    }

    /// Message safe to show to end users.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "an unexpected error occurred".to_string(),
            Self::TransactionConflict(_) => {
                "the request conflicted with a concurrent update; please retry".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Unauthorized(message) => write!(f, "unauthorized: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::TransactionConflict(message) => write!(f, "transaction conflict: {message}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        if is_conflict(&value) {
            Self::TransactionConflict(value.to_string())
        } else {
            Self::Internal(value.to_string())
        }
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound {
                entity,
                id: id.to_string(),
            },
            RepoError::InvalidCounter { entity, field } => Self::Validation(
                ValidationError::field("field", format!("{entity} has no `{field}` counter")),
            ),
            RepoError::Db(err) => Self::from(err),
            RepoError::InvalidData(message) => Self::Internal(message),
        }
    }
}

/// Returns whether a driver error represents retryable contention.
///
/// Busy/locked databases and unique-index races both resolve on retry once
/// the competing transaction has committed.
pub(crate) fn is_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => true,
            rusqlite::ErrorCode::ConstraintViolation => {
                failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            }
            _ => false,
        },
        _ => false,
    }
}
