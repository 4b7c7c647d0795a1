// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-hostname async locks.
//!
//! Both sync loops reconcile through one [`super::DnsReconciler`]. Holding the
//! hostname's lock across list, compare and write keeps the two loops from
//! interleaving writes for the same name. Unused entries are pruned when the
//! last guard drops, so the map only ever holds names being reconciled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Lock table keyed by normalized hostname.
#[derive(Debug, Clone, Default)]
pub struct HostLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// Holds one hostname's lock until dropped.
#[derive(Debug)]
pub struct HostGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Mutex<LockMap>>,
}

/// Lowercase without the trailing root dot, so `A.example.com.` and
/// `a.example.com` share a lock.
fn normalize(hostname: &str) -> String {
    hostname.trim_end_matches('.').to_ascii_lowercase()
}

impl HostLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `hostname`.
    pub async fn lock(&self, hostname: &str) -> HostGuard {
        let key = normalize(hostname);

        let mutex = {
            let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(key.clone()).or_default())
        };

        let guard = mutex.lock_owned().await;

        HostGuard {
            key,
            guard: Some(guard),
            table: Arc::clone(&self.inner),
        }
    }

    /// Number of hostnames currently locked or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        // Table lock first: nobody can clone the entry while we check its count
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());

        if table
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            table.remove(&self.key);
        }
    }
}

#[cfg(test)]
#[path = "host_locks_tests.rs"]
mod host_locks_tests;
