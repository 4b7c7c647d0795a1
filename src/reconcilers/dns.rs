// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hostname reconciliation against the DNS provider.

use super::host_locks::HostLocks;
use crate::errors::ReconcileError;
use crate::public_ip::PublicIpResolver;
use crate::records::{DnsRecord, DnsRecordStore, RecordRequest, ZoneHandle};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info};

/// Record settings applied when this process writes a record.
///
/// `None` leaves the choice to the provider on create, and keeps the existing
/// record's value on update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordDefaults {
    pub ttl: Option<u32>,
    pub proxied: Option<bool>,
}

/// Result of one successful [`DnsReconciler::reconcile`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No A record existed; one was created
    Created { content: Ipv4Addr },
    /// The record pointed elsewhere and was rewritten
    Updated { from: String, to: Ipv4Addr },
    /// The record already held the public IP; nothing was written
    AlreadyCurrent { content: Ipv4Addr },
}

impl ReconcileOutcome {
    /// Metric label for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::AlreadyCurrent { .. } => "unchanged",
        }
    }

    /// True if a create or update was issued.
    #[must_use]
    pub fn wrote(&self) -> bool {
        !matches!(self, Self::AlreadyCurrent { .. })
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { content } => write!(f, "created -> {content}"),
            Self::Updated { from, to } => write!(f, "updated {from} -> {to}"),
            Self::AlreadyCurrent { content } => write!(f, "already {content}"),
        }
    }
}

/// Converges a hostname's A record to the current public IP.
///
/// The provider is the only source of truth: every call lists the zone, then
/// re-reads the matching record by id before comparing. Calls for the same
/// hostname are serialized through [`HostLocks`].
#[derive(Clone)]
pub struct DnsReconciler {
    store: Arc<dyn DnsRecordStore>,
    resolver: Arc<dyn PublicIpResolver>,
    locks: HostLocks,
    defaults: RecordDefaults,
}

impl DnsReconciler {
    #[must_use]
    pub fn new(store: Arc<dyn DnsRecordStore>, resolver: Arc<dyn PublicIpResolver>) -> Self {
        Self {
            store,
            resolver,
            locks: HostLocks::new(),
            defaults: RecordDefaults::default(),
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: RecordDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn zone(&self) -> &ZoneHandle {
        self.store.zone()
    }

    /// Reconcile one hostname.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Provider`] if any provider call fails
    /// - [`ReconcileError::PublicIp`] if the public IP cannot be resolved
    /// - [`ReconcileError::DuplicateRecords`] if more than one A record has this name
    pub async fn reconcile(&self, hostname: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let _guard = self.locks.lock(hostname).await;

        let records = self.store.list().await?;
        let matching: Vec<&DnsRecord> = records
            .iter()
            .filter(|r| r.is_a_record() && r.has_name(hostname))
            .collect();

        match matching.as_slice() {
            [] => self.create(hostname).await,
            [existing] => self.converge(hostname, &existing.id).await,
            duplicates => Err(ReconcileError::DuplicateRecords {
                hostname: hostname.to_string(),
                zone: self.zone().to_string(),
                count: duplicates.len(),
            }),
        }
    }

    async fn create(&self, hostname: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let ip = self.resolver.resolve().await?;

        let request = RecordRequest::a(hostname, ip.to_string())
            .with_ttl(self.defaults.ttl)
            .with_proxied(self.defaults.proxied);
        self.store.create(&request).await?;

        info!(hostname = hostname, zone = %self.zone(), content = %ip, "Created A record");
        Ok(ReconcileOutcome::Created { content: ip })
    }

    async fn converge(
        &self,
        hostname: &str,
        record_id: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let current = self.store.get(record_id).await?;
        let ip = self.resolver.resolve().await?;

        if content_matches(&current.content, ip) {
            debug!(hostname = hostname, content = %ip, "A record already current");
            return Ok(ReconcileOutcome::AlreadyCurrent { content: ip });
        }

        let request = RecordRequest::a(hostname, ip.to_string())
            .with_ttl(self.defaults.ttl.or(current.ttl))
            .with_proxied(self.defaults.proxied.or(current.proxied));
        self.store.update(record_id, &request).await?;

        info!(
            hostname = hostname,
            zone = %self.zone(),
            from = %current.content,
            to = %ip,
            "Updated A record"
        );
        Ok(ReconcileOutcome::Updated {
            from: current.content,
            to: ip,
        })
    }
}

/// Compare record content with an address, as an address when it parses.
pub(crate) fn content_matches(content: &str, ip: Ipv4Addr) -> bool {
    let content = content.trim();
    match content.parse::<Ipv4Addr>() {
        Ok(existing) => existing == ip,
        Err(_) => content == ip.to_string(),
    }
}
