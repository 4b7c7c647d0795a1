// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for both sync loops.
//!
//! Built once in `main` and handed to each loop as `Arc<Context>`. It holds
//! the Ingress source, the reconciler (which owns the DNS store, the public
//! IP resolver and the per-host locks) and the loop timings. There is no
//! process-wide mutable state outside of it.

use crate::constants::{
    DEFAULT_FULL_SYNC_INTERVAL_SECS, DEFAULT_LABEL_SYNC_INTERVAL_SECS,
    DEFAULT_LIST_RETRY_BACKOFF_SECS, DEFAULT_LIST_TIMEOUT_SECS,
};
use crate::ingress::IngressHostSource;
use crate::labels::SENTINEL_LABEL;
use crate::reconcilers::DnsReconciler;
use std::sync::Arc;
use std::time::Duration;

/// Shared context passed to the sync loops.
#[derive(Clone)]
pub struct Context {
    /// Where Ingress intent comes from
    pub ingresses: Arc<dyn IngressHostSource>,

    /// Converges hostnames; shared so both loops serialize on the same host locks
    pub reconciler: Arc<DnsReconciler>,

    /// Loop cadence and list deadlines
    pub settings: SyncSettings,
}

/// Timings and the label key the loops run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Sleep between full sync cycles
    pub full_sync_interval: Duration,
    /// Sleep between label trigger cycles
    pub label_sync_interval: Duration,
    /// Deadline for one Ingress listing
    pub list_timeout: Duration,
    /// Sleep before retrying a failed listing
    pub list_retry_backoff: Duration,
    /// Label whose presence requests an off-cycle reconcile
    pub sentinel_label: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            full_sync_interval: Duration::from_secs(DEFAULT_FULL_SYNC_INTERVAL_SECS),
            label_sync_interval: Duration::from_secs(DEFAULT_LABEL_SYNC_INTERVAL_SECS),
            list_timeout: Duration::from_secs(DEFAULT_LIST_TIMEOUT_SECS),
            list_retry_backoff: Duration::from_secs(DEFAULT_LIST_RETRY_BACKOFF_SECS),
            sentinel_label: SENTINEL_LABEL.to_string(),
        }
    }
}

impl Context {
    #[must_use]
    pub fn new(
        ingresses: Arc<dyn IngressHostSource>,
        reconciler: Arc<DnsReconciler>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            ingresses,
            reconciler,
            settings,
        }
    }
}
