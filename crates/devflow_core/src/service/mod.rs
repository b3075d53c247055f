//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate authorization, transactions and repository calls into
//!   use-case level APIs.
//! - Emit invalidation signals once a write has committed.
//!
//! # Invariants
//! - Authorization runs before the first store access of an operation.
//! - Mutations touching more than one row run in one transaction through
//!   `db::run_in_transaction`.

pub mod answer_service;
pub mod collection_service;
pub mod question_service;
pub mod reconcile_service;
pub mod vote_service;

use crate::auth::{Authorizer, RequestContext, SessionAuthorizer};
use crate::config::{CoreConfig, PaginationConfig};
use crate::db::TxPolicy;
use crate::error::CoreResult;
use crate::invalidation::{Invalidation, InvalidationSink, LogInvalidationSink};
use crate::model::user::UserId;
use std::sync::Arc;

/// Dependencies shared by every service.
#[derive(Clone)]
pub struct ServiceContext {
    authorizer: Arc<dyn Authorizer>,
    invalidation: Arc<dyn InvalidationSink>,
    tx_policy: TxPolicy,
    pagination: PaginationConfig,
}

impl ServiceContext {
    pub fn new(authorizer: Arc<dyn Authorizer>, invalidation: Arc<dyn InvalidationSink>) -> Self {
        Self {
            authorizer,
            invalidation,
            tx_policy: TxPolicy::default(),
            pagination: PaginationConfig::default(),
        }
    }

    /// Session authorization with log-backed invalidation, bounded by
    /// `config`.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(Arc::new(SessionAuthorizer), Arc::new(LogInvalidationSink))
            .with_tx_policy(config.transactions.policy())
            .with_pagination(config.pagination)
    }

    pub fn with_tx_policy(mut self, policy: TxPolicy) -> Self {
        self.tx_policy = policy;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn tx_policy(&self) -> &TxPolicy {
        &self.tx_policy
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    pub(crate) fn authorize(&self, request: &RequestContext) -> CoreResult<UserId> {
        self.authorizer.authorize(request)
    }

    pub(crate) fn emit(&self, signals: impl IntoIterator<Item = Invalidation>) {
        for signal in signals {
            self.invalidation.invalidate(signal);
        }
    }
}
