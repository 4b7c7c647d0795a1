// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kube::{
    api::{Api, DeleteParams, PostParams},
    client::Client,
};
use kubehomedns::cloudflare::CloudflareClient;
use kubehomedns::context::{Context, SyncSettings};
use kubehomedns::errors::ClusterError;
use kubehomedns::http::{build_http_client, install_crypto_provider};
use kubehomedns::ingress::{Acknowledgement, IngressHostSource, IngressRef, IngressSnapshot};
use kubehomedns::public_ip::HttpIpResolver;
use kubehomedns::reconcilers::DnsReconciler;
use kubehomedns::records::ZoneHandle;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ZONE: &str = "zone-1";
pub const TOKEN: &str = "test-token";
pub const RECORDS_PATH: &str = "/client/v4/zones/zone-1/dns_records";

// ============================================================================
// Mock provider
// ============================================================================

/// Reconciler wired to the real Cloudflare client and IP resolver, both
/// pointed at `server`.
pub fn reconciler_for(server: &MockServer) -> DnsReconciler {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    let store = CloudflareClient::new(http.clone(), TOKEN, ZoneHandle::new(ZONE))
        .with_base_url(&format!("{}/client/v4", server.uri()));
    let resolver = HttpIpResolver::with_url(http, format!("{}/ip", server.uri()));
    DnsReconciler::new(Arc::new(store), Arc::new(resolver))
}

pub async fn mount_public_ip(server: &MockServer, ip: &str) {
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ip": ip })))
        .mount(server)
        .await;
}

pub fn record_json(id: &str, name: &str, content: &str) -> Value {
    json!({
        "id": id,
        "type": "A",
        "name": name,
        "content": content,
        "ttl": 300,
        "proxied": false
    })
}

pub fn list_body(records: &[Value]) -> Value {
    json!({
        "success": true,
        "errors": [],
        "result": records,
        "result_info": { "page": 1, "per_page": 100, "total_pages": 1, "count": records.len() }
    })
}

pub async fn mount_list(server: &MockServer, records: &[Value]) {
    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(records)))
        .mount(server)
        .await;
}

pub async fn mount_get(server: &MockServer, record: &Value) {
    let id = record["id"].as_str().unwrap();
    Mock::given(method("GET"))
        .and(path(format!("{RECORDS_PATH}/{id}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": record })),
        )
        .mount(server)
        .await;
}

// ============================================================================
// In-memory Ingress source
// ============================================================================

/// Ingresses held in memory; acknowledging strips the label.
pub struct MemoryIngresses {
    label: String,
    items: Mutex<Vec<IngressSnapshot>>,
    acknowledged: Mutex<Vec<IngressRef>>,
}

impl MemoryIngresses {
    pub fn new(label: &str, items: Vec<IngressSnapshot>) -> Self {
        Self {
            label: label.to_string(),
            items: Mutex::new(items),
            acknowledged: Mutex::new(Vec::new()),
        }
    }

    pub fn acknowledged(&self) -> Vec<IngressRef> {
        self.acknowledged.lock().unwrap().clone()
    }

    pub fn labelled(&self) -> usize {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.has_label(&self.label))
            .count()
    }
}

#[async_trait]
impl IngressHostSource for MemoryIngresses {
    async fn list_ingresses(&self) -> Result<Vec<IngressSnapshot>, ClusterError> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn acknowledge(&self, reference: &IngressRef) -> Result<Acknowledgement, ClusterError> {
        self.acknowledged.lock().unwrap().push(reference.clone());
        let mut items = self.items.lock().unwrap();
        match items.iter_mut().find(|i| &i.reference == reference) {
            Some(item) => match item.labels.remove(&self.label) {
                Some(_) => Ok(Acknowledgement::Cleared),
                None => Ok(Acknowledgement::AlreadyCleared),
            },
            None => Ok(Acknowledgement::Gone),
        }
    }
}

pub fn ingress(name: &str, labels: &[&str], hosts: &[&str]) -> IngressSnapshot {
    IngressSnapshot {
        reference: IngressRef::new("default", name),
        labels: labels
            .iter()
            .map(|k| ((*k).to_string(), String::new()))
            .collect::<BTreeMap<_, _>>(),
        rule_hosts: hosts.iter().map(|h| Some((*h).to_string())).collect(),
    }
}

pub fn context(ingresses: Arc<MemoryIngresses>, reconciler: DnsReconciler) -> Context {
    Context::new(ingresses, Arc::new(reconciler), SyncSettings::default())
}

// ============================================================================
// Live cluster helpers
// ============================================================================

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    install_crypto_provider();
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    let ns = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                "test": "integration",
                "managed-by": "kubehomedns-test"
            }
        }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
        Err(e) => Err(Box::new(e)),
    }
}

/// Cleanup test namespace
pub async fn cleanup_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(Box::new(e)),
    }
}
