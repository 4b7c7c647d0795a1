// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic reconciliation of every Ingress rule host.

use super::{list_hosts_with_timeout, reconcile_and_report, run_loop, SyncReport, Trigger};
use crate::context::Context;
use crate::errors::ClusterError;
use std::sync::Arc;
use tracing::debug;

/// One full sync cycle.
///
/// Every rule host on every Ingress is reconciled, sequentially. Rules without
/// a host contribute nothing.
///
/// # Errors
///
/// Returns [`ClusterError`] only if listing fails. Reconciliation errors are
/// counted in the report.
pub async fn full_sync_once(ctx: &Context) -> Result<SyncReport, ClusterError> {
    let hosts = list_hosts_with_timeout(ctx).await?;
    debug!(hosts = hosts.len(), "Listed ingress hosts");

    let mut report = SyncReport::default();
    for host in &hosts {
        let reference = host.ingress_ref();
        let result = reconcile_and_report(ctx, Trigger::FullSync, &reference, &host.host).await;
        report.record(&result);
    }

    Ok(report)
}

/// Run full sync cycles until the task is aborted.
pub async fn run_full_sync_loop(ctx: Arc<Context>) {
    let interval = ctx.settings.full_sync_interval;
    run_loop(ctx, Trigger::FullSync, interval, |ctx| async move {
        full_sync_once(&ctx).await
    })
    .await;
}
