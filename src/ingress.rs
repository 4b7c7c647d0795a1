// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress host discovery and sentinel-label acknowledgement.
//!
//! The sync loops only ever see [`IngressSnapshot`]s, a read-only projection
//! of the fields that matter here: identity, labels and the per-rule hosts.
//! Mutation is limited to one operation, [`IngressHostSource::acknowledge`],
//! which removes the sentinel label with an optimistic-concurrency write.

use crate::constants::MAX_CONFLICT_RETRIES;
use crate::errors::ClusterError;
use crate::pagination::list_all_paginated;
use crate::retry::{retry_on_conflict, RetryError};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Namespaced identity of an Ingress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IngressRef {
    pub namespace: String,
    pub name: String,
}

impl IngressRef {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for IngressRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Read-only view of one Ingress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressSnapshot {
    pub reference: IngressRef,
    pub labels: BTreeMap<String, String>,
    /// One entry per rule, in declaration order. `None` for rules without a host.
    pub rule_hosts: Vec<Option<String>>,
}

impl IngressSnapshot {
    /// Project an Ingress. Returns `None` when it lacks a name or namespace.
    #[must_use]
    pub fn from_ingress(ingress: &Ingress) -> Option<Self> {
        let name = ingress.metadata.name.clone()?;
        let namespace = ingress.metadata.namespace.clone()?;

        let rule_hosts = ingress
            .spec
            .as_ref()
            .and_then(|spec| spec.rules.as_ref())
            .map(|rules| {
                rules
                    .iter()
                    .map(|rule| rule.host.clone().filter(|h| !h.trim().is_empty()))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            reference: IngressRef { namespace, name },
            labels: ingress.labels().clone(),
            rule_hosts,
        })
    }

    /// True if the label key is present, whatever its value.
    #[must_use]
    pub fn has_label(&self, key: &str) -> bool {
        self.labels.contains_key(key)
    }

    /// Host of the first rule, if that rule declares one.
    #[must_use]
    pub fn first_rule_host(&self) -> Option<&str> {
        self.rule_hosts.first().and_then(Option::as_deref)
    }

    /// Every rule host on this Ingress, skipping rules without one.
    pub fn hosts(&self) -> impl Iterator<Item = IngressHost> + '_ {
        self.rule_hosts.iter().flatten().map(|host| IngressHost {
            namespace: self.reference.namespace.clone(),
            ingress_name: self.reference.name.clone(),
            host: host.clone(),
            labels: self.labels.clone(),
        })
    }
}

/// One hostname together with the Ingress that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressHost {
    pub namespace: String,
    pub ingress_name: String,
    pub host: String,
    pub labels: BTreeMap<String, String>,
}

impl IngressHost {
    /// The Ingress this host came from.
    #[must_use]
    pub fn ingress_ref(&self) -> IngressRef {
        IngressRef::new(self.namespace.as_str(), self.ingress_name.as_str())
    }
}

/// Flatten snapshots into one entry per rule host.
#[must_use]
pub fn extract_hosts(snapshots: &[IngressSnapshot]) -> Vec<IngressHost> {
    snapshots.iter().flat_map(IngressSnapshot::hosts).collect()
}

/// What [`IngressHostSource::acknowledge`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The label was present and has been removed
    Cleared,
    /// The label was already gone
    AlreadyCleared,
    /// The Ingress no longer exists
    Gone,
}

impl Acknowledgement {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cleared => "cleared",
            Self::AlreadyCleared => "already_cleared",
            Self::Gone => "gone",
        }
    }
}

/// Source of Ingress objects.
#[async_trait]
pub trait IngressHostSource: Send + Sync {
    /// All Ingresses in all namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if the list fails.
    async fn list_ingresses(&self) -> Result<Vec<IngressSnapshot>, ClusterError>;

    /// Every `(ingress, host)` pair in the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if the list fails.
    async fn list_hosts(&self) -> Result<Vec<IngressHost>, ClusterError> {
        Ok(extract_hosts(&self.list_ingresses().await?))
    }

    /// Remove the sentinel label from one Ingress, leaving every other field untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if the write fails or keeps conflicting.
    async fn acknowledge(&self, reference: &IngressRef) -> Result<Acknowledgement, ClusterError>;
}

/// Remove a label in place. Returns true if it was present.
pub fn strip_label(ingress: &mut Ingress, key: &str) -> bool {
    ingress
        .metadata
        .labels
        .as_mut()
        .is_some_and(|labels| labels.remove(key).is_some())
}

/// [`IngressHostSource`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeIngressSource {
    client: Client,
    sentinel_label: String,
}

impl KubeIngressSource {
    #[must_use]
    pub fn new(client: Client, sentinel_label: impl Into<String>) -> Self {
        Self {
            client,
            sentinel_label: sentinel_label.into(),
        }
    }
}

#[async_trait]
impl IngressHostSource for KubeIngressSource {
    async fn list_ingresses(&self) -> Result<Vec<IngressSnapshot>, ClusterError> {
        let api: Api<Ingress> = Api::all(self.client.clone());

        let ingresses = list_all_paginated(&api, ListParams::default())
            .await
            .map_err(|source| ClusterError::Api {
                operation: "list ingresses".to_string(),
                source,
            })?;

        debug!(count = ingresses.len(), "Listed ingresses");
        Ok(ingresses
            .iter()
            .filter_map(IngressSnapshot::from_ingress)
            .collect())
    }

    async fn acknowledge(&self, reference: &IngressRef) -> Result<Acknowledgement, ClusterError> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), &reference.namespace);
        let operation = format!("acknowledge ingress {reference}");

        // Each attempt re-reads so `replace` carries the latest resourceVersion
        let outcome = retry_on_conflict(
            || {
                let api = api.clone();
                let name = reference.name.clone();
                let label = self.sentinel_label.clone();
                async move {
                    let Some(mut ingress) = api.get_opt(&name).await? else {
                        return Ok(Acknowledgement::Gone);
                    };
                    if !strip_label(&mut ingress, &label) {
                        return Ok(Acknowledgement::AlreadyCleared);
                    }
                    api.replace(&name, &PostParams::default(), &ingress).await?;
                    Ok::<_, kube::Error>(Acknowledgement::Cleared)
                }
            },
            &operation,
            MAX_CONFLICT_RETRIES,
        )
        .await;

        match outcome {
            Ok(ack) => {
                info!(ingress = %reference, result = ack.as_str(), "Acknowledged ingress");
                Ok(ack)
            }
            // Deleted between get and replace
            Err(RetryError::Fatal(kube::Error::Api(e))) if e.code == 404 => {
                Ok(Acknowledgement::Gone)
            }
            Err(RetryError::Fatal(source)) => Err(ClusterError::Api { operation, source }),
            Err(RetryError::Exhausted { attempts, .. }) => {
                Err(ClusterError::ConflictRetriesExhausted {
                    namespace: reference.namespace.clone(),
                    name: reference.name.clone(),
                    attempts,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
