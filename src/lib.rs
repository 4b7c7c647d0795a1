// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # kubehomedns - Cloudflare A records for Kubernetes Ingress hosts
//!
//! kubehomedns keeps a Cloudflare zone's A records pointed at the cluster's
//! current public IPv4 address, for every hostname declared on an Ingress.
//!
//! ## Overview
//!
//! - A long-interval full sync reconciles every Ingress rule host
//! - A short-interval label trigger reconciles the first host of any Ingress
//!   labelled `kubehomedns`, then removes the label
//! - Each reconciliation lists the zone, compares against a freshly resolved
//!   public IP and writes only when they differ
//!
//! ## Modules
//!
//! - [`cloudflare`] - Cloudflare DNS records API client
//! - [`public_ip`] - Public IPv4 discovery
//! - [`records`] - Record model and the [`records::DnsRecordStore`] capability
//! - [`reconcilers`] - Per-hostname reconciliation with per-host locking
//! - [`ingress`] - Ingress listing and sentinel-label acknowledgement
//! - [`sync`] - The full sync and label trigger loops
//! - [`context`] - Dependencies shared by the loops
//! - [`config`] - Command line, environment and credentials
//!
//! ## Example
//!
//! ```rust,no_run
//! use kubehomedns::cloudflare::CloudflareClient;
//! use kubehomedns::http::build_http_client;
//! use kubehomedns::public_ip::HttpIpResolver;
//! use kubehomedns::reconcilers::DnsReconciler;
//! use kubehomedns::records::ZoneHandle;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let http = build_http_client(Duration::from_secs(10))?;
//! let store = CloudflareClient::new(http.clone(), "api-token", ZoneHandle::new("zone-id"));
//! let reconciler = DnsReconciler::new(Arc::new(store), Arc::new(HttpIpResolver::new(http)));
//!
//! let outcome = reconciler.reconcile("home.example.com").await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

pub mod cloudflare;
pub mod config;
pub mod constants;
pub mod context;
pub mod errors;
pub mod http;
pub mod ingress;
pub mod labels;
pub mod metrics;
pub mod metrics_server;
pub mod pagination;
pub mod public_ip;
pub mod reconcilers;
pub mod records;
pub mod retry;
pub mod sync;

#[cfg(test)]
mod testing;
