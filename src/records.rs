// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS record model and the record-store capability.
//!
//! [`DnsRecordStore`] is the seam between the reconciler and a DNS provider.
//! It is scoped to a single zone; the provider's records are the only durable
//! state the system has, so nothing here caches.

use crate::constants::A_RECORD_TYPE;
use crate::errors::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque provider-assigned zone identifier. Fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneHandle {
    id: String,
}

impl ZoneHandle {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ZoneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// DNS record type as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    Mx,
    Ns,
    Srv,
    Caa,
    /// Any type this crate does not manage
    #[serde(other)]
    Other,
}

/// A record as held by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider record identifier
    pub id: String,
    /// Fully qualified name; the reconciliation key
    pub name: String,
    /// Record data (an IPv4 literal for A records)
    pub content: String,
    /// Record type; absent in some trimmed provider responses
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    /// TTL in seconds (`1` means provider-automatic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Whether traffic is proxied through the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

impl DnsRecord {
    /// Returns true if this record is an A record, or its type was not reported.
    #[must_use]
    pub fn is_a_record(&self) -> bool {
        matches!(self.record_type, None | Some(RecordType::A))
    }

    /// Returns true if this record's name designates `hostname`.
    #[must_use]
    pub fn has_name(&self, hostname: &str) -> bool {
        names_match(&self.name, hostname)
    }
}

/// Compare DNS names case-insensitively, ignoring a trailing root dot.
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Body of a create or update call. The record type is always A.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRequest {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

impl RecordRequest {
    /// An A record request with provider-default TTL and proxy settings.
    #[must_use]
    pub fn a(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            record_type: A_RECORD_TYPE,
            name: name.into(),
            content: content.into(),
            ttl: None,
            proxied: None,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<u32>) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_proxied(mut self, proxied: Option<bool>) -> Self {
        self.proxied = proxied;
        self
    }
}

/// Record CRUD for one zone.
///
/// Every method is a single provider round trip bounded by the HTTP client's
/// timeout. Implementations must not retry; the polling loops own retry policy.
#[async_trait]
pub trait DnsRecordStore: Send + Sync {
    /// The zone every operation is scoped to.
    fn zone(&self) -> &ZoneHandle;

    /// List all records in the zone, in provider order.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] on transport failure, non-2xx status or malformed body.
    async fn list(&self) -> Result<Vec<DnsRecord>, ProviderError>;

    /// Fetch one record. A missing record is a `ProviderError` with status 404.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] on transport failure, non-2xx status or malformed body.
    async fn get(&self, id: &str) -> Result<DnsRecord, ProviderError>;

    /// Create an A record.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] on transport failure or non-2xx status.
    async fn create(&self, record: &RecordRequest) -> Result<(), ProviderError>;

    /// Overwrite record `id` and return the provider's confirmation.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] on transport failure, non-2xx status or an
    /// undecodable confirmation.
    async fn update(&self, id: &str, record: &RecordRequest) -> Result<DnsRecord, ProviderError>;

    /// Delete record `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] on transport failure or non-2xx status.
    async fn delete(&self, id: &str) -> Result<(), ProviderError>;
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod records_tests;
