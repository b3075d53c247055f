//! Core domain logic for the DevFlow Q&A backend.
//! This crate is the single source of truth for vote, answer and counter
//! invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod invalidation;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod validation;

pub use auth::{Authorizer, RequestContext, SessionAuthorizer};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, run_in_transaction, Store, TxPolicy};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invalidation::{
    Invalidation, InvalidationSink, LogInvalidationSink, NoopInvalidationSink,
    RecordingInvalidationSink,
};
pub use logging::{
    default_log_level, init_logging, init_logging_from, logging_status, LogSettings,
};
pub use model::vote::{VoteKind, VoteStatus, VoteTarget, VoteTransition};
pub use repo::{RepoError, RepoResult};
pub use service::answer_service::{AnswerService, AnswersPage};
pub use service::collection_service::{CollectionService, SaveStatus};
pub use service::question_service::QuestionService;
pub use service::reconcile_service::{ReconcileReport, ReconcileService};
pub use service::vote_service::{VoteOutcome, VoteService};
pub use service::ServiceContext;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
