// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Off-cycle reconciliation requested through the sentinel label.
//!
//! An Ingress carrying the label has its first rule host reconciled on the
//! next short cycle, after which the label is removed as an acknowledgement.
//! A failed reconcile leaves the label in place so the next cycle retries.
//! Removing the label does not roll back a DNS write that already happened.

use super::{list_with_timeout, reconcile_and_report, run_loop, SyncReport, Trigger};
use crate::context::Context;
use crate::errors::ClusterError;
use crate::ingress::IngressSnapshot;
use crate::metrics;
use std::sync::Arc;
use tracing::{error, warn};

/// One label trigger cycle.
///
/// # Errors
///
/// Returns [`ClusterError`] only if listing fails. Reconciliation and
/// acknowledgement errors are logged and counted in the report.
pub async fn label_trigger_once(ctx: &Context) -> Result<SyncReport, ClusterError> {
    let label = ctx.settings.sentinel_label.as_str();
    let snapshots = list_with_timeout(ctx).await?;
    let mut report = SyncReport::default();

    for snapshot in snapshots.iter().filter(|s| s.has_label(label)) {
        handle_triggered(ctx, snapshot, &mut report).await;
    }

    Ok(report)
}

async fn handle_triggered(ctx: &Context, snapshot: &IngressSnapshot, report: &mut SyncReport) {
    let reference = &snapshot.reference;

    match snapshot.first_rule_host() {
        Some(host) => {
            let result = reconcile_and_report(ctx, Trigger::LabelTrigger, reference, host).await;
            report.record(&result);
            if result.is_err() {
                return;
            }
        }
        None => {
            warn!(
                ingress = %reference,
                label = %ctx.settings.sentinel_label,
                "Labelled ingress has no host on its first rule, clearing label"
            );
            report.skipped += 1;
        }
    }

    match ctx.ingresses.acknowledge(reference).await {
        Ok(ack) => {
            metrics::record_acknowledgement(ack.as_str());
            report.acknowledged += 1;
        }
        Err(e) => {
            metrics::record_acknowledgement("failed");
            metrics::record_error(Trigger::LabelTrigger.as_str(), e.error_type());
            error!(
                ingress = %reference,
                error = %e,
                "Failed to remove sentinel label; the DNS change stands and the ingress will be retried"
            );
        }
    }
}

/// Run label trigger cycles until the task is aborted.
pub async fn run_label_trigger_loop(ctx: Arc<Context>) {
    let interval = ctx.settings.label_sync_interval;
    run_loop(ctx, Trigger::LabelTrigger, interval, |ctx| async move {
        label_trigger_once(&ctx).await
    })
    .await;
}
