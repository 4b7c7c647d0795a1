// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared JSON-over-HTTP transport.
//!
//! The DNS provider adapter and the public IP resolver share one
//! [`reqwest::Client`] (one connection pool, one client-side timeout). Every
//! request goes through [`send_json`], which attaches a bearer credential only
//! when one is supplied and non-empty, so the unauthenticated IP lookup uses the
//! same path as the authenticated provider calls.

use crate::errors::HttpError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Install `ring` as the process-wide rustls crypto provider.
///
/// The Kubernetes and HTTP clients each enable a different provider, and
/// rustls will not pick between them. Must run before either client is built.
/// Calling it again is a no-op.
pub fn install_crypto_provider() {
    // Err only means a provider is already installed
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Build the shared HTTP client with a fixed per-request timeout.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> Result<HttpClient, reqwest::Error> {
    HttpClient::builder()
        .timeout(timeout)
        .user_agent(concat!("kubehomedns/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Send one request and return the body of a 2xx response.
///
/// `Content-Type: application/json` is always set. `Authorization: Bearer` is set
/// only when `token` is `Some` and non-empty.
///
/// # Errors
///
/// - [`HttpError::Network`] when the request cannot be sent or the body cannot be read
/// - [`HttpError::Status`] for any non-2xx status
pub(crate) async fn send_json<B: Serialize + ?Sized>(
    client: &HttpClient,
    token: Option<&str>,
    method: Method,
    url: &str,
    body: Option<&B>,
) -> Result<String, HttpError> {
    debug!(method = %method, url = %url, auth_enabled = token.is_some_and(|t| !t.is_empty()), "HTTP request");

    let mut request = client
        .request(method.clone(), url)
        .header(CONTENT_TYPE, "application/json");

    if let Some(body_data) = body {
        request = request.json(body_data);
    }

    if let Some(token_value) = token.filter(|t| !t.is_empty()) {
        request = request.bearer_auth(token_value);
    }

    let response = request.send().await.map_err(|source| HttpError::Network {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    let text = response.text().await.map_err(|source| HttpError::Network {
        url: url.to_string(),
        source,
    })?;

    if !status.is_success() {
        return Err(HttpError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            message: provider_error_message(&text),
        });
    }

    debug!(
        method = %method,
        url = %url,
        status = %status,
        response_len = text.len(),
        "HTTP request successful"
    );

    Ok(text)
}

/// Parse a response body, mapping failures to [`HttpError::Decode`].
pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, HttpError> {
    serde_json::from_str(body).map_err(|source| HttpError::Decode {
        url: url.to_string(),
        source,
    })
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Extract a readable message from an error body.
///
/// Cloudflare wraps failures as `{"success": false, "errors": [{"code": .., "message": ..}]}`;
/// anything else is returned trimmed, or a placeholder when empty.
pub(crate) fn provider_error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(first) = envelope.errors.first() {
            return match first.code {
                Some(code) => format!("{} (code {code})", first.message),
                None => first.message.clone(),
            };
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
