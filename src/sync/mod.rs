// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Polling loops that turn Ingress intent into DNS reconciliations.
//!
//! Two loops run side by side, each in its own task:
//!
//! - [`run_full_sync_loop`] - every rule host of every Ingress, on a long interval
//! - [`run_label_trigger_loop`] - the first rule host of Ingresses carrying the
//!   sentinel label, on a short interval, then removes the label
//!
//! A cycle lists Ingresses under a deadline, reconciles sequentially, then
//! sleeps. A failed listing sleeps the short retry backoff instead of the full
//! interval. Per-hostname errors are logged and counted; they never end a
//! cycle early or stop a loop.

pub mod full_sync;
pub mod label_trigger;

pub use full_sync::{full_sync_once, run_full_sync_loop};
pub use label_trigger::{label_trigger_once, run_label_trigger_loop};

use crate::context::Context;
use crate::errors::{ClusterError, ReconcileError};
use crate::ingress::{IngressHost, IngressRef, IngressSnapshot};
use crate::metrics;
use crate::reconcilers::ReconcileOutcome;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Which loop asked for a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    FullSync,
    LabelTrigger,
}

impl Trigger {
    /// Metric and log label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullSync => "full_sync",
            Self::LabelTrigger => "label_trigger",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tally of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Hostnames handed to the reconciler
    pub attempted: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Sentinel labels removed (label trigger only)
    pub acknowledged: usize,
    /// Labelled Ingresses whose first rule has no host (label trigger only)
    pub skipped: usize,
}

impl SyncReport {
    /// Count one reconciliation result.
    pub fn record(&mut self, result: &Result<ReconcileOutcome, ReconcileError>) {
        self.attempted += 1;
        match result {
            Ok(ReconcileOutcome::Created { .. }) => self.created += 1,
            Ok(ReconcileOutcome::Updated { .. }) => self.updated += 1,
            Ok(ReconcileOutcome::AlreadyCurrent { .. }) => self.unchanged += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// List Ingresses, giving up after the configured deadline.
///
/// # Errors
///
/// Returns the source's [`ClusterError`], or [`ClusterError::Timeout`] when the
/// deadline passes first.
pub async fn list_with_timeout(ctx: &Context) -> Result<Vec<IngressSnapshot>, ClusterError> {
    with_list_timeout(ctx, ctx.ingresses.list_ingresses()).await
}

/// List every `(ingress, host)` pair under the same deadline.
///
/// # Errors
///
/// As [`list_with_timeout`].
pub async fn list_hosts_with_timeout(ctx: &Context) -> Result<Vec<IngressHost>, ClusterError> {
    with_list_timeout(ctx, ctx.ingresses.list_hosts()).await
}

async fn with_list_timeout<T>(
    ctx: &Context,
    list: impl Future<Output = Result<T, ClusterError>>,
) -> Result<T, ClusterError> {
    let timeout = ctx.settings.list_timeout;
    tokio::time::timeout(timeout, list)
        .await
        .unwrap_or_else(|_| {
            Err(ClusterError::Timeout {
                operation: "list ingresses".to_string(),
                timeout,
            })
        })
}

/// Reconcile one hostname, then log and count the result.
pub(crate) async fn reconcile_and_report(
    ctx: &Context,
    trigger: Trigger,
    ingress: &IngressRef,
    hostname: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let start = Instant::now();
    let result = ctx.reconciler.reconcile(hostname).await;
    let elapsed = start.elapsed();

    match &result {
        Ok(outcome) => {
            metrics::record_reconciliation(trigger.as_str(), outcome.as_str(), elapsed);
            info!(
                trigger = %trigger,
                ingress = %ingress,
                hostname = hostname,
                outcome = %outcome,
                "Reconciled hostname"
            );
        }
        Err(e) => {
            metrics::record_reconciliation(trigger.as_str(), "failed", elapsed);
            metrics::record_error(trigger.as_str(), e.error_type());
            warn!(
                trigger = %trigger,
                ingress = %ingress,
                hostname = hostname,
                zone = %ctx.reconciler.zone(),
                status = ?e.status(),
                transient = e.is_transient(),
                error = %e,
                "Failed to reconcile hostname, retrying next cycle"
            );
        }
    }

    result
}

/// Drive `cycle` forever: interval sleep after a completed cycle, backoff
/// sleep after a failed listing.
async fn run_loop<F, Fut>(ctx: Arc<Context>, trigger: Trigger, interval: Duration, cycle: F)
where
    F: Fn(Arc<Context>) -> Fut,
    Fut: Future<Output = Result<SyncReport, ClusterError>>,
{
    info!(
        trigger = %trigger,
        interval = ?interval,
        list_timeout = ?ctx.settings.list_timeout,
        "Starting sync loop"
    );

    loop {
        match cycle(Arc::clone(&ctx)).await {
            Ok(report) => {
                metrics::record_sync_cycle(trigger.as_str(), "completed");
                info!(
                    trigger = %trigger,
                    attempted = report.attempted,
                    created = report.created,
                    updated = report.updated,
                    unchanged = report.unchanged,
                    failed = report.failed,
                    acknowledged = report.acknowledged,
                    skipped = report.skipped,
                    "Sync cycle complete"
                );
                tokio::time::sleep(interval).await;
            }
            Err(e) => {
                metrics::record_sync_cycle(trigger.as_str(), "list_failed");
                metrics::record_error(trigger.as_str(), e.error_type());
                error!(
                    trigger = %trigger,
                    error = %e,
                    retry_after = ?ctx.settings.list_retry_backoff,
                    "Failed to list ingresses"
                );
                tokio::time::sleep(ctx.settings.list_retry_backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod mod_tests;
