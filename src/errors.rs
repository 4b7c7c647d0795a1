// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for kubehomedns.
//!
//! This module provides specialized error types for:
//! - HTTP transport failures shared by the DNS provider and IP discovery adapters
//! - DNS provider record operations, carrying operation and zone context
//! - Public IP discovery
//! - Kubernetes API calls made by the Ingress adapter
//! - Per-hostname reconciliation
//! - Startup configuration
//!
//! Only [`ConfigError`] is fatal. Every other error is logged by the polling
//! loops and retried on a later cycle.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single JSON-over-HTTP round trip.
#[derive(Error, Debug)]
pub enum HttpError {
    /// Connection refused, DNS failure, TLS failure or client-side timeout
    #[error("request to {url} failed: {source}")]
    Network {
        /// The URL that was requested
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status
    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        /// The URL that was requested
        url: String,
        /// HTTP status code
        status: u16,
        /// Provider error message when one could be extracted, else the raw body
        message: String,
    },

    /// The body of a successful response could not be parsed
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The URL that was requested
        url: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

impl HttpError {
    /// HTTP status code, when the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network { .. } | Self::Decode { .. } => None,
        }
    }
}

/// DNS provider record operation, used as error and log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOperation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl RecordOperation {
    /// Lower-case name used in logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for RecordOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS provider call failed.
#[derive(Error, Debug)]
#[error("DNS provider {operation} in zone {zone} failed: {source}")]
pub struct ProviderError {
    /// Which record operation failed
    pub operation: RecordOperation,
    /// Zone the operation was scoped to
    pub zone: String,
    /// Transport-level cause
    #[source]
    pub source: HttpError,
}

impl ProviderError {
    /// HTTP status returned by the provider, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.source.status()
    }

    /// Returns true when the provider reported the record as missing (HTTP 404).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Short category label for metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self.source {
            HttpError::Network { .. } => "network_error",
            HttpError::Status { .. } => "provider_error",
            HttpError::Decode { .. } => "decode_error",
        }
    }
}

/// Public IP discovery failed.
#[derive(Error, Debug)]
pub enum PublicIpError {
    /// The discovery service could not be reached
    #[error("public IP lookup via {url} failed: {source}")]
    Network {
        /// Discovery service URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx status, or a body without a usable IPv4 `ip` field
    #[error("public IP service {url} returned an unusable response: {reason}")]
    Protocol {
        /// Discovery service URL
        url: String,
        /// What was wrong with the response
        reason: String,
    },
}

impl From<HttpError> for PublicIpError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Network { url, source } => Self::Network { url, source },
            HttpError::Status {
                url,
                status,
                message,
            } => Self::Protocol {
                url,
                reason: format!("HTTP {status}: {message}"),
            },
            HttpError::Decode { url, source } => Self::Protocol {
                url,
                reason: source.to_string(),
            },
        }
    }
}

/// A Kubernetes API call made on behalf of a polling loop failed.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The API server rejected the call or could not be reached
    #[error("Kubernetes API {operation} failed: {source}")]
    Api {
        /// Human-readable operation (e.g. "list ingresses")
        operation: String,
        /// Underlying client error
        #[source]
        source: kube::Error,
    },

    /// The call did not finish within its deadline
    #[error("Kubernetes API {operation} timed out after {timeout:?}")]
    Timeout {
        /// Human-readable operation
        operation: String,
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// Every write-back attempt lost an optimistic-concurrency race
    #[error("Ingress {namespace}/{name} still conflicting after {attempts} attempts")]
    ConflictRetriesExhausted {
        /// Ingress namespace
        namespace: String,
        /// Ingress name
        name: String,
        /// Attempts made
        attempts: u32,
    },
}

impl ClusterError {
    /// Short category label for metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Api { .. } => "cluster_api_error",
            Self::Timeout { .. } => "cluster_timeout",
            Self::ConflictRetriesExhausted { .. } => "cluster_conflict",
        }
    }
}

/// Reconciling one hostname failed. The hostname is skipped until the next cycle.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// DNS provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Public IP could not be resolved
    #[error(transparent)]
    PublicIp(#[from] PublicIpError),

    /// More than one A record carries the hostname, so no record is authoritative
    #[error("{count} A records named '{hostname}' exist in zone {zone}; refusing to choose one")]
    DuplicateRecords {
        /// The hostname being reconciled
        hostname: String,
        /// Zone that holds the duplicates
        zone: String,
        /// Number of matching records
        count: usize,
    },
}

impl ReconcileError {
    /// Short category label for metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Provider(e) => e.error_type(),
            Self::PublicIp(PublicIpError::Network { .. }) => "public_ip_network_error",
            Self::PublicIp(PublicIpError::Protocol { .. }) => "public_ip_protocol_error",
            Self::DuplicateRecords { .. } => "duplicate_records",
        }
    }

    /// HTTP status involved in the failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider(e) => e.status(),
            Self::PublicIp(_) | Self::DuplicateRecords { .. } => None,
        }
    }

    /// Returns true if retrying on a later cycle can succeed without operator action.
    ///
    /// Duplicate records and provider 4xx responses (other than 429) need a human.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(e) => match e.status() {
                Some(status) => status == 429 || status >= 500,
                None => true,
            },
            Self::PublicIp(_) => true,
            Self::DuplicateRecords { .. } => false,
        }
    }
}

/// Startup configuration is missing or unusable. Fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required value was not provided
    #[error("required setting {key} is not set")]
    Missing {
        /// Environment variable or Secret key
        key: String,
    },

    /// A required value was provided but empty
    #[error("required setting {key} is empty")]
    Empty {
        /// Environment variable or Secret key
        key: String,
    },

    /// The credentials Secret could not be read
    #[error("failed to read Secret {namespace}/{name}: {source}")]
    Secret {
        /// Secret namespace
        namespace: String,
        /// Secret name
        name: String,
        /// Underlying client error
        #[source]
        source: kube::Error,
    },

    /// A Secret value is not valid UTF-8
    #[error("key {key} in Secret {namespace}/{name} is not valid UTF-8")]
    InvalidUtf8 {
        /// Secret namespace
        namespace: String,
        /// Secret name
        name: String,
        /// Offending key
        key: String,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
