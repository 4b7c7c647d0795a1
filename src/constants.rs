// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for kubehomedns.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Provider Constants
// ============================================================================

/// Base URL of the Cloudflare v4 API
pub const CLOUDFLARE_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Records requested per page when listing a zone
pub const CLOUDFLARE_LIST_PAGE_SIZE: u32 = 100;

/// Record type managed by the reconciler
pub const A_RECORD_TYPE: &str = "A";

// ============================================================================
// Public IP Discovery Constants
// ============================================================================

/// Endpoint returning the caller's public address as `{"ip": "..."}`
pub const PUBLIC_IP_SERVICE_URL: &str = "https://api.ipify.org?format=json";

// ============================================================================
// HTTP Client Constants
// ============================================================================

/// Client-side timeout for every provider and IP-discovery request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Polling Loop Constants
// ============================================================================

/// Interval between full Ingress sweeps (30 minutes)
pub const DEFAULT_FULL_SYNC_INTERVAL_SECS: u64 = 1800;

/// Interval between sentinel-label sweeps (2 minutes)
pub const DEFAULT_LABEL_SYNC_INTERVAL_SECS: u64 = 120;

/// Deadline for one cluster-wide Ingress listing
pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 10;

/// Delay before retrying a failed Ingress listing
pub const DEFAULT_LIST_RETRY_BACKOFF_SECS: u64 = 10;

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for paginated Kubernetes list calls
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

/// Attempts made to write an Ingress back before giving up on conflicts
pub const MAX_CONFLICT_RETRIES: u32 = 5;

// ============================================================================
// Credential Constants
// ============================================================================

/// Environment variable holding the provider API token
pub const ENV_CLOUDFLARE_API_KEY: &str = "CLOUDFLARE_API_KEY";

/// Environment variable holding the zone identifier
pub const ENV_CLOUDFLARE_ZONE_ID: &str = "CLOUDFLARE_ZONE_ID";

/// Namespace of the credentials Secret
pub const DEFAULT_CREDENTIALS_SECRET_NAMESPACE: &str = "kubehomedns";

/// Name of the credentials Secret
pub const DEFAULT_CREDENTIALS_SECRET_NAME: &str = "cloudflare-credentials";

/// Secret key holding the provider API token
pub const SECRET_KEY_API_KEY: &str = "cloudflare_api_key";

/// Secret key holding the zone identifier
pub const SECRET_KEY_ZONE_ID: &str = "cloudflare_zone_id";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";

/// Default bind address for metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";
