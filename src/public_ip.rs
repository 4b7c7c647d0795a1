// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Public IPv4 discovery.
//!
//! The reconciler asks a [`PublicIpResolver`] for the cluster's egress address
//! every time it makes a decision. Nothing is cached: a record is only ever
//! compared against a freshly resolved address.

use crate::constants::PUBLIC_IP_SERVICE_URL;
use crate::errors::PublicIpError;
use crate::http::{decode, send_json};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::Deserialize;
use std::net::Ipv4Addr;
use tracing::debug;

/// Resolves the current public IPv4 address.
#[async_trait]
pub trait PublicIpResolver: Send + Sync {
    /// # Errors
    ///
    /// - [`PublicIpError::Network`] on connect or timeout failures
    /// - [`PublicIpError::Protocol`] on non-2xx status or an unusable body
    async fn resolve(&self) -> Result<Ipv4Addr, PublicIpError>;
}

#[derive(Deserialize)]
struct IpResponse {
    ip: String,
}

/// Resolver backed by an HTTP service returning `{"ip": "<address>"}`.
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    client: HttpClient,
    url: String,
}

impl HttpIpResolver {
    /// Resolver for the default discovery service, reusing the shared HTTP client.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self::with_url(client, PUBLIC_IP_SERVICE_URL)
    }

    #[must_use]
    pub fn with_url(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PublicIpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<Ipv4Addr, PublicIpError> {
        let body = send_json::<()>(&self.client, None, Method::GET, &self.url, None).await?;
        let response: IpResponse = decode(&self.url, &body)?;

        let ip = response
            .ip
            .trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| PublicIpError::Protocol {
                url: self.url.clone(),
                reason: format!("'{}' is not an IPv4 address", response.ip),
            })?;

        debug!(public_ip = %ip, "Resolved public IP");
        Ok(ip)
    }
}

#[cfg(test)]
#[path = "public_ip_tests.rs"]
mod public_ip_tests;
