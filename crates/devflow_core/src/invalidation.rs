//! Cache invalidation signals emitted after successful writes.
//!
//! # Responsibility
//! - Name the rendered views a committed write made stale.
//! - Deliver those names to a pluggable sink.
//!
//! # Invariants
//! - Signals are emitted only after the owning transaction commits.
//! - Emission is fire-and-forget: a sink cannot fail an operation.

use crate::model::question::QuestionId;
use crate::model::user::UserId;
use log::info;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

/// One stale view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Invalidation {
    /// `/question/{id}`.
    QuestionPage(QuestionId),
    /// `/profile/{id}`.
    ProfilePage(UserId),
}

impl Invalidation {
    pub fn path(&self) -> String {
        match self {
            Self::QuestionPage(id) => format!("/question/{id}"),
            Self::ProfilePage(id) => format!("/profile/{id}"),
        }
    }
}

impl Display for Invalidation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Receiver of invalidation signals.
pub trait InvalidationSink: Send + Sync {
    fn invalidate(&self, signal: Invalidation);
}

/// Writes each signal to the core log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInvalidationSink;

impl InvalidationSink for LogInvalidationSink {
    fn invalidate(&self, signal: Invalidation) {
        info!(
            "event=invalidate module=invalidation status=ok path={}",
            signal.path()
        );
    }
}

/// Drops every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidationSink;

impl InvalidationSink for NoopInvalidationSink {
    fn invalidate(&self, _signal: Invalidation) {}
}

/// Keeps signals in memory in emission order.
#[derive(Debug, Default)]
pub struct RecordingInvalidationSink {
    signals: Mutex<Vec<Invalidation>>,
}

impl RecordingInvalidationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded signals.
    pub fn signals(&self) -> Vec<Invalidation> {
        match self.signals.lock() {
            Ok(signals) => signals.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drains recorded signals.
    pub fn take(&self) -> Vec<Invalidation> {
        match self.signals.lock() {
            Ok(mut signals) => std::mem::take(&mut *signals),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl InvalidationSink for RecordingInvalidationSink {
    fn invalidate(&self, signal: Invalidation) {
        match self.signals.lock() {
            Ok(mut signals) => signals.push(signal),
            Err(poisoned) => poisoned.into_inner().push(signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Invalidation, InvalidationSink, RecordingInvalidationSink};
    use uuid::Uuid;

    #[test]
    fn recording_sink_keeps_emission_order_and_drains() {
        let question_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let sink = RecordingInvalidationSink::new();
        sink.invalidate(Invalidation::QuestionPage(question_id));
        sink.invalidate(Invalidation::ProfilePage(user_id));

        assert_eq!(
            sink.take(),
            vec![
                Invalidation::QuestionPage(question_id),
                Invalidation::ProfilePage(user_id)
            ]
        );
        assert!(sink.signals().is_empty());
    }

    #[test]
    fn paths_name_the_rendered_views() {
        let id = Uuid::nil();
        assert_eq!(
            Invalidation::QuestionPage(id).path(),
            format!("/question/{id}")
        );
        assert_eq!(Invalidation::ProfilePage(id).to_string(), format!("/profile/{id}"));
    }
}
