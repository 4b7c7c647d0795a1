// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare DNS record store.
//!
//! [`CloudflareClient`] implements [`DnsRecordStore`] over the Cloudflare v4
//! `dns_records` endpoints for one zone:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list      | `GET    /zones/{zone}/dns_records?page=N&per_page=M` |
//! | get       | `GET    /zones/{zone}/dns_records/{id}` |
//! | create    | `POST   /zones/{zone}/dns_records` |
//! | update    | `PUT    /zones/{zone}/dns_records/{id}` |
//! | delete    | `DELETE /zones/{zone}/dns_records/{id}` |
//!
//! # Example
//!
//! ```rust,no_run
//! use kubehomedns::cloudflare::CloudflareClient;
//! use kubehomedns::http::build_http_client;
//! use kubehomedns::records::{DnsRecordStore, ZoneHandle};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let http = build_http_client(Duration::from_secs(10))?;
//! let store = CloudflareClient::new(http, "api-token", ZoneHandle::new("zone-id"));
//!
//! for record in store.list().await? {
//!     println!("{} -> {}", record.name, record.content);
//! }
//! # Ok(())
//! # }
//! ```

mod types;

use crate::constants::{CLOUDFLARE_API_BASE_URL, CLOUDFLARE_LIST_PAGE_SIZE};
use crate::errors::{HttpError, ProviderError, RecordOperation};
use crate::http::{decode, send_json};
use crate::records::{DnsRecord, DnsRecordStore, RecordRequest, ZoneHandle};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use std::sync::Arc;
use tracing::{debug, info};
use types::Envelope;

/// DNS record store backed by the Cloudflare v4 API.
#[derive(Clone)]
pub struct CloudflareClient {
    /// Shared HTTP client (connection pool and timeout)
    client: HttpClient,
    /// Bearer credential
    token: Arc<String>,
    /// API root, without trailing slash
    base_url: String,
    zone: ZoneHandle,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("base_url", &self.base_url)
            .field("zone", &self.zone)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl CloudflareClient {
    /// Create a client for `zone` against the public Cloudflare API.
    #[must_use]
    pub fn new(client: HttpClient, token: impl Into<String>, zone: ZoneHandle) -> Self {
        Self {
            client,
            token: Arc::new(token.into()),
            base_url: CLOUDFLARE_API_BASE_URL.to_string(),
            zone,
        }
    }

    /// Point the client at a different API root (e.g. a test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone.id())
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{id}", self.records_url())
    }

    fn provider_error(&self, operation: RecordOperation, source: HttpError) -> ProviderError {
        ProviderError {
            operation,
            zone: self.zone.id().to_string(),
            source,
        }
    }

    async fn call(
        &self,
        operation: RecordOperation,
        method: Method,
        url: &str,
        body: Option<&RecordRequest>,
    ) -> Result<String, ProviderError> {
        send_json(&self.client, Some(self.token.as_str()), method, url, body)
            .await
            .map_err(|e| self.provider_error(operation, e))
    }

    fn decode_record(
        &self,
        operation: RecordOperation,
        url: &str,
        body: &str,
    ) -> Result<DnsRecord, ProviderError> {
        decode::<Envelope<DnsRecord>>(url, body)
            .map(|envelope| envelope.result)
            .map_err(|e| self.provider_error(operation, e))
    }
}

#[async_trait]
impl DnsRecordStore for CloudflareClient {
    fn zone(&self) -> &ZoneHandle {
        &self.zone
    }

    async fn list(&self) -> Result<Vec<DnsRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let url = format!(
                "{}?page={page}&per_page={CLOUDFLARE_LIST_PAGE_SIZE}",
                self.records_url()
            );
            let body = self
                .call(RecordOperation::List, Method::GET, &url, None)
                .await?;
            let envelope: Envelope<Vec<DnsRecord>> = decode(&url, &body)
                .map_err(|e| self.provider_error(RecordOperation::List, e))?;

            let fetched = envelope.result.len();
            records.extend(envelope.result);

            debug!(
                zone = %self.zone,
                page = page,
                records_in_page = fetched,
                total_records = records.len(),
                "Fetched DNS record page"
            );

            match envelope.result_info {
                Some(info) if fetched > 0 && info.has_more_after(page) => page += 1,
                _ => break,
            }
        }

        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<DnsRecord, ProviderError> {
        let url = self.record_url(id);
        let body = self
            .call(RecordOperation::Get, Method::GET, &url, None)
            .await?;
        self.decode_record(RecordOperation::Get, &url, &body)
    }

    async fn create(&self, record: &RecordRequest) -> Result<(), ProviderError> {
        let url = self.records_url();
        self.call(RecordOperation::Create, Method::POST, &url, Some(record))
            .await?;

        info!(
            zone = %self.zone,
            record_name = %record.name,
            content = %record.content,
            "DNS record created"
        );
        Ok(())
    }

    async fn update(&self, id: &str, record: &RecordRequest) -> Result<DnsRecord, ProviderError> {
        let url = self.record_url(id);
        let body = self
            .call(RecordOperation::Update, Method::PUT, &url, Some(record))
            .await?;
        let confirmed = self.decode_record(RecordOperation::Update, &url, &body)?;

        info!(
            zone = %self.zone,
            record_id = %id,
            record_name = %confirmed.name,
            new_content = %confirmed.content,
            "DNS record updated"
        );
        Ok(confirmed)
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        let url = self.record_url(id);
        self.call(RecordOperation::Delete, Method::DELETE, &url, None)
            .await?;

        info!(zone = %self.zone, record_id = %id, "DNS record deleted");
        Ok(())
    }
}
