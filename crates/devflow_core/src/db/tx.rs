//! Bounded, retryable transaction runner.
//!
//! # Responsibility
//! - Wrap one logical mutation in `BEGIN IMMEDIATE` / `COMMIT`.
//! - Roll back explicitly on every error path before returning.
//! - Retry `TransactionConflict` with linear backoff up to a bounded count.
//!
//! # Invariants
//! - No partial write is ever committed: the body either fully commits or
//!   the transaction is rolled back.
//! - A body that overruns `TxPolicy::timeout` is rolled back and reported as
//!   a retryable conflict.

use crate::error::{CoreError, CoreResult};
use log::{debug, error, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::{Duration, Instant};

/// Attempt, backoff and timeout bounds for one transactional operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxPolicy {
    /// Total attempts including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub timeout: Duration,
}

impl Default for TxPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(25),
            timeout: Duration::from_secs(2),
        }
    }
}

impl TxPolicy {
    /// Same bounds with retries disabled.
    pub fn single_attempt(self) -> Self {
        Self {
            max_attempts: 1,
            ..self
        }
    }
}

/// Runs `body` inside an immediate transaction under `policy`.
///
/// `body` may run more than once when a retryable conflict occurs, so it
/// must not have side effects outside the transaction.
///
/// # Errors
/// - `TransactionConflict` when contention persists past `max_attempts`, or
///   the body overruns `timeout`.
/// - Any error returned by `body`, after rollback.
pub fn run_in_transaction<T, F>(
    conn: &mut Connection,
    policy: &TxPolicy,
    operation: &'static str,
    mut body: F,
) -> CoreResult<T>
where
    F: FnMut(&Transaction<'_>) -> CoreResult<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;
    loop {
        let started_at = Instant::now();
        match run_once(conn, policy, &mut body) {
            Ok(value) => {
                debug!(
                    "event=tx module=db status=ok op={} attempt={} duration_ms={}",
                    operation,
                    attempt,
                    started_at.elapsed().as_millis()
                );
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(
                    "event=tx module=db status=retry op={} attempt={} duration_ms={} error_code={}",
                    operation,
                    attempt,
                    started_at.elapsed().as_millis(),
                    err.kind()
                );
                std::thread::sleep(policy.base_backoff * attempt);
                attempt += 1;
            }
            Err(err) => {
                warn!(
                    "event=tx module=db status=error op={} attempt={} duration_ms={} error_code={}",
                    operation,
                    attempt,
                    started_at.elapsed().as_millis(),
                    err.kind()
                );
                return Err(err);
            }
        }
    }
}

fn run_once<T, F>(conn: &mut Connection, policy: &TxPolicy, body: &mut F) -> CoreResult<T>
where
    F: FnMut(&Transaction<'_>) -> CoreResult<T>,
{
    let started_at = Instant::now();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let outcome = match body(&tx) {
        Ok(_) if started_at.elapsed() > policy.timeout => Err(CoreError::TransactionConflict(
            format!("transaction exceeded {} ms timeout", policy.timeout.as_millis()),
        )),
        other => other,
    };

    match outcome {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                error!(
                    "event=tx_rollback module=db status=error error={}",
                    rollback_err
                );
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{run_in_transaction, TxPolicy};
    use crate::db::open_db_in_memory;
    use crate::error::CoreError;
    use std::time::Duration;

    fn user_count(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn error_in_body_rolls_back_every_write() {
        let mut conn = open_db_in_memory().unwrap();
        let result: Result<(), CoreError> =
            run_in_transaction(&mut conn, &TxPolicy::default(), "test", |tx| {
                tx.execute(
                    "INSERT INTO users (id, name, created_at) VALUES ('u1', 'ann', 0);",
                    [],
                )?;
                Err(CoreError::Unauthorized("stop".into()))
            });
        assert!(matches!(result, Err(CoreError::Unauthorized(_))));
        assert_eq!(user_count(&conn), 0);
    }

    #[test]
    fn retryable_conflict_is_retried_until_success() {
        let mut conn = open_db_in_memory().unwrap();
        let policy = TxPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        };
        let mut calls = 0;
        let value = run_in_transaction(&mut conn, &policy, "test", |_tx| {
            calls += 1;
            if calls < 3 {
                Err(CoreError::TransactionConflict("busy".into()))
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn conflict_surfaces_after_attempts_are_exhausted() {
        let mut conn = open_db_in_memory().unwrap();
        let policy = TxPolicy::default().single_attempt();
        let mut calls = 0;
        let result: Result<(), CoreError> = run_in_transaction(&mut conn, &policy, "test", |_tx| {
            calls += 1;
            Err(CoreError::TransactionConflict("busy".into()))
        });
        assert!(matches!(result, Err(CoreError::TransactionConflict(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn body_overrunning_timeout_is_rolled_back_as_conflict() {
        let mut conn = open_db_in_memory().unwrap();
        let policy = TxPolicy {
            max_attempts: 1,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(5),
        };
        let result = run_in_transaction(&mut conn, &policy, "test", |tx| {
            tx.execute(
                "INSERT INTO users (id, name, created_at) VALUES ('u1', 'ann', 0);",
                [],
            )?;
            std::thread::sleep(Duration::from_millis(20));
            Ok(())
        });
        assert!(matches!(result, Err(CoreError::TransactionConflict(_))));
        assert_eq!(user_count(&conn), 0);
    }
}
