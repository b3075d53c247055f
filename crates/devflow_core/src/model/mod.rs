//! Domain model for the Q&A core.
//!
//! # Responsibility
//! - Define the entities the counter, vote, answer and read-pipeline
//!   components operate on.
//! - Keep counters as plain fields; the durable records (votes, answers,
//!   collections) are the source of truth they are derived from.
//!
//! # Invariants
//! - Every entity is identified by a stable `Uuid`.
//! - Counters start at zero and only change through the counter store.

pub mod answer;
pub mod collection;
pub mod question;
pub mod user;
pub mod vote;

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
