// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Startup configuration.
//!
//! Every flag can also be set through an environment variable. Cloudflare
//! credentials come either from `CLOUDFLARE_API_KEY` / `CLOUDFLARE_ZONE_ID`
//! or from a Kubernetes Secret. Any missing or empty credential is fatal.

use crate::constants::{
    CLOUDFLARE_API_BASE_URL, DEFAULT_CREDENTIALS_SECRET_NAME, DEFAULT_CREDENTIALS_SECRET_NAMESPACE,
    DEFAULT_FULL_SYNC_INTERVAL_SECS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LABEL_SYNC_INTERVAL_SECS,
    DEFAULT_LIST_RETRY_BACKOFF_SECS, DEFAULT_LIST_TIMEOUT_SECS, DEFAULT_METRICS_BIND_ADDRESS,
    ENV_CLOUDFLARE_API_KEY, ENV_CLOUDFLARE_ZONE_ID, PUBLIC_IP_SERVICE_URL, SECRET_KEY_API_KEY,
    SECRET_KEY_ZONE_ID,
};
use crate::context::SyncSettings;
use crate::errors::ConfigError;
use crate::labels::SENTINEL_LABEL;
use crate::reconcilers::RecordDefaults;
use clap::{Parser, ValueEnum};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Where Cloudflare credentials are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CredentialsSource {
    /// `CLOUDFLARE_API_KEY` and `CLOUDFLARE_ZONE_ID`
    Env,
    /// A Kubernetes Secret
    Secret,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "kubehomedns")]
#[command(about = "Keep Cloudflare A records for Ingress hosts pointed at the public IP", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Where to read Cloudflare credentials from
    #[arg(long, env = "KUBEHOMEDNS_CREDENTIALS_SOURCE", value_enum, default_value_t = CredentialsSource::Env)]
    pub credentials_source: CredentialsSource,

    /// Namespace of the credentials Secret
    #[arg(long, env = "KUBEHOMEDNS_SECRET_NAMESPACE", default_value = DEFAULT_CREDENTIALS_SECRET_NAMESPACE)]
    pub secret_namespace: String,

    /// Name of the credentials Secret
    #[arg(long, env = "KUBEHOMEDNS_SECRET_NAME", default_value = DEFAULT_CREDENTIALS_SECRET_NAME)]
    pub secret_name: String,

    /// Cloudflare API base URL
    #[arg(long, env = "KUBEHOMEDNS_API_BASE_URL", default_value = CLOUDFLARE_API_BASE_URL)]
    pub api_base_url: String,

    /// Public IP discovery URL; must answer `{"ip": "..."}`
    #[arg(long, env = "KUBEHOMEDNS_PUBLIC_IP_URL", default_value = PUBLIC_IP_SERVICE_URL)]
    pub public_ip_url: String,

    /// Timeout for every outbound HTTP call, in seconds
    #[arg(long, env = "KUBEHOMEDNS_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Seconds between full sync cycles
    #[arg(long, env = "KUBEHOMEDNS_FULL_SYNC_INTERVAL_SECS", default_value_t = DEFAULT_FULL_SYNC_INTERVAL_SECS)]
    pub full_sync_interval_secs: u64,

    /// Seconds between label trigger cycles
    #[arg(long, env = "KUBEHOMEDNS_LABEL_SYNC_INTERVAL_SECS", default_value_t = DEFAULT_LABEL_SYNC_INTERVAL_SECS)]
    pub label_sync_interval_secs: u64,

    /// Deadline for one Ingress listing, in seconds
    #[arg(long, env = "KUBEHOMEDNS_LIST_TIMEOUT_SECS", default_value_t = DEFAULT_LIST_TIMEOUT_SECS)]
    pub list_timeout_secs: u64,

    /// Seconds to wait before retrying a failed listing
    #[arg(long, env = "KUBEHOMEDNS_LIST_RETRY_BACKOFF_SECS", default_value_t = DEFAULT_LIST_RETRY_BACKOFF_SECS)]
    pub list_retry_backoff_secs: u64,

    /// Label key that requests an immediate reconcile
    #[arg(long, env = "KUBEHOMEDNS_SENTINEL_LABEL", default_value = SENTINEL_LABEL)]
    pub sentinel_label: String,

    /// TTL for records this process writes (provider default when unset)
    #[arg(long, env = "KUBEHOMEDNS_RECORD_TTL")]
    pub record_ttl: Option<u32>,

    /// Proxy setting for records this process writes (provider default when unset)
    #[arg(long, env = "KUBEHOMEDNS_PROXIED")]
    pub proxied: Option<bool>,

    /// Path to a kubeconfig file; `KUBECONFIG` or in-cluster config when unset
    #[arg(long, env = "KUBEHOMEDNS_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Bind address for /metrics and /healthz; empty disables the server
    #[arg(long, env = "KUBEHOMEDNS_METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: String,
}

impl Cli {
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            full_sync_interval: Duration::from_secs(self.full_sync_interval_secs),
            label_sync_interval: Duration::from_secs(self.label_sync_interval_secs),
            list_timeout: Duration::from_secs(self.list_timeout_secs),
            list_retry_backoff: Duration::from_secs(self.list_retry_backoff_secs),
            sentinel_label: self.sentinel_label.clone(),
        }
    }

    #[must_use]
    pub fn record_defaults(&self) -> RecordDefaults {
        RecordDefaults {
            ttl: self.record_ttl,
            proxied: self.proxied,
        }
    }

    /// Metrics listener address, or `None` when disabled.
    #[must_use]
    pub fn metrics_address(&self) -> Option<&str> {
        let addr = self.metrics_bind_address.trim();
        (!addr.is_empty()).then_some(addr)
    }
}

/// Cloudflare API token and zone.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub zone_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

fn required(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty {
            key: key.to_string(),
        });
    }
    Ok(value.to_string())
}

impl Credentials {
    /// Read credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either variable is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either variable is unset or empty.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: required(ENV_CLOUDFLARE_API_KEY, lookup(ENV_CLOUDFLARE_API_KEY))?,
            zone_id: required(ENV_CLOUDFLARE_ZONE_ID, lookup(ENV_CLOUDFLARE_ZONE_ID))?,
        })
    }

    /// Extract credentials from a Secret's `data` map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a key is missing, empty or not UTF-8.
    pub fn from_secret_data(
        namespace: &str,
        name: &str,
        data: &BTreeMap<String, ByteString>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| -> Result<String, ConfigError> {
            let value = data
                .get(key)
                .map(|bytes| {
                    String::from_utf8(bytes.0.clone()).map_err(|_| ConfigError::InvalidUtf8 {
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                        key: key.to_string(),
                    })
                })
                .transpose()?;
            required(key, value)
        };

        Ok(Self {
            api_key: read(SECRET_KEY_API_KEY)?,
            zone_id: read(SECRET_KEY_ZONE_ID)?,
        })
    }

    /// Read credentials from a Secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the Secret cannot be read or lacks a key.
    pub async fn from_secret(
        client: Client,
        namespace: &str,
        name: &str,
    ) -> Result<Self, ConfigError> {
        let api: Api<Secret> = Api::namespaced(client, namespace);
        let secret = api.get(name).await.map_err(|source| ConfigError::Secret {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;

        Self::from_secret_data(namespace, name, &secret.data.unwrap_or_default())
    }

    /// Load credentials from the source selected on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the credentials are unavailable.
    pub async fn load(cli: &Cli, client: &Client) -> Result<Self, ConfigError> {
        let credentials = match cli.credentials_source {
            CredentialsSource::Env => Self::from_env()?,
            CredentialsSource::Secret => {
                Self::from_secret(client.clone(), &cli.secret_namespace, &cli.secret_name).await?
            }
        };
        info!(
            source = ?cli.credentials_source,
            zone = %credentials.zone_id,
            "Loaded Cloudflare credentials"
        );
        Ok(credentials)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
