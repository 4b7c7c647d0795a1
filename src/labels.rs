// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label constants read from and written to Ingress objects.

/// Sentinel label marking an Ingress for immediate reconciliation.
///
/// Only the key matters; any value (including empty) triggers the label loop,
/// which removes the label once the Ingress's first host has been reconciled.
pub const SENTINEL_LABEL: &str = "kubehomedns";
