//! Counter audit and repair.
//!
//! # Responsibility
//! - Report cached counters that disagree with their underlying records.
//! - Rewrite drifted counters from a recount in one transaction.
//!
//! # Invariants
//! - `audit_counters` never writes.
//! - After `reconcile_counters` commits, an audit in the same store reports
//!   no drift until the next unbalanced write.

use super::ServiceContext;
use crate::db::run_in_transaction;
use crate::error::CoreResult;
use crate::invalidation::Invalidation;
use crate::model::vote::VoteTarget;
use crate::repo::counter_repo::{CounterDrift, CounterStore, SqliteCounterStore};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Drift found (and, for reconcile, corrected) in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub corrections: Vec<CounterDrift>,
    /// Whether `corrections` were written back.
    pub applied: bool,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Counter maintenance facade.
pub struct ReconcileService {
    ctx: ServiceContext,
}

impl ReconcileService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn audit_counters(&self, conn: &Connection) -> CoreResult<ReconcileReport> {
        let corrections = SqliteCounterStore::new(conn).find_drift()?;
        info!(
            "event=counter_audit module=service status=ok drift_count={}",
            corrections.len()
        );
        Ok(ReconcileReport {
            corrections,
            applied: false,
        })
    }

    pub fn reconcile_counters(&self, conn: &mut Connection) -> CoreResult<ReconcileReport> {
        let corrections = run_in_transaction(conn, self.ctx.tx_policy(), "reconcile_counters", |tx| {
            let counters = SqliteCounterStore::new(tx);
            let drift = counters.find_drift()?;
            for entry in &drift {
                counters.set_counter(entry.target, entry.field, entry.actual)?;
            }
            Ok(drift)
        })?;

        for entry in &corrections {
            warn!(
                "event=counter_reconcile module=service status=fixed target={} field={} cached={} actual={}",
                entry.target,
                entry.field.column(),
                entry.cached,
                entry.actual
            );
        }
        info!(
            "event=counter_reconcile module=service status=ok corrected={}",
            corrections.len()
        );
        let stale_pages: BTreeSet<_> = corrections
            .iter()
            .filter_map(|entry| match entry.target {
                VoteTarget::Question(id) => Some(id),
                VoteTarget::Answer(_) => None,
            })
            .collect();
        self.ctx
            .emit(stale_pages.into_iter().map(Invalidation::QuestionPage));
        Ok(ReconcileReport {
            corrections,
            applied: true,
        })
    }
}
