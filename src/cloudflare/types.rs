// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 response envelopes.

use serde::Deserialize;

/// `{"result": ..., "result_info": ...}` wrapper around every successful response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: T,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

/// Pagination block attached to list responses.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl ResultInfo {
    /// Returns true when the provider reports pages after `current`.
    pub fn has_more_after(&self, current: u32) -> bool {
        let page = self.page.unwrap_or(current);
        self.total_pages.is_some_and(|total| page < total)
    }
}
