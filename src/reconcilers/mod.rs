// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS reconciliation.
//!
//! # Reconciliation Architecture
//!
//! Each call re-derives state from the provider and ends converged or with an
//! error:
//!
//! 1. **List** - Fetch the zone's records and pick the A record named for the host
//! 2. **Absent** - Resolve the public IP and create the record
//! 3. **Found** - Re-read the record by id, resolve the public IP and compare
//! 4. **Converged** - Update only when the content differs
//!
//! Nothing is retained between calls. Duplicate A records for one name are an
//! error; no write is issued until an operator removes the extras.
//!
//! # Example
//!
//! ```rust,no_run
//! use kubehomedns::reconcilers::DnsReconciler;
//!
//! async fn refresh(reconciler: &DnsReconciler) -> anyhow::Result<()> {
//!     let outcome = reconciler.reconcile("home.example.com").await?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```

pub mod dns;
pub mod host_locks;

pub use dns::{DnsReconciler, ReconcileOutcome, RecordDefaults};
pub use host_locks::{HostGuard, HostLocks};
