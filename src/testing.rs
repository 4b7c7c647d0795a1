// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes for unit tests.

use crate::errors::{ClusterError, HttpError, ProviderError, PublicIpError, RecordOperation};
use crate::ingress::{Acknowledgement, IngressHostSource, IngressRef, IngressSnapshot};
use crate::public_ip::PublicIpResolver;
use crate::records::{names_match, DnsRecord, DnsRecordStore, RecordRequest, RecordType, ZoneHandle};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const TEST_ZONE: &str = "zone-123";

fn provider_failure(operation: RecordOperation, status: u16) -> ProviderError {
    ProviderError {
        operation,
        zone: TEST_ZONE.to_string(),
        source: HttpError::Status {
            url: format!("fake://zones/{TEST_ZONE}/dns_records"),
            status,
            message: "injected failure".to_string(),
        },
    }
}

pub fn a_record(id: &str, name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.to_string(),
        name: name.to_string(),
        content: content.to_string(),
        record_type: Some(RecordType::A),
        ttl: Some(300),
        proxied: Some(false),
    }
}

/// Zone held in memory; counts every call.
pub struct FakeRecordStore {
    zone: ZoneHandle,
    pub records: Mutex<Vec<DnsRecord>>,
    pub creates: Mutex<Vec<RecordRequest>>,
    pub updates: Mutex<Vec<(String, RecordRequest)>>,
    pub lists: AtomicUsize,
    pub gets: AtomicUsize,
    /// Hostnames whose writes answer HTTP 500
    pub failing_hosts: Mutex<HashSet<String>>,
    pub fail_list: AtomicBool,
    next_id: AtomicUsize,
}

impl Default for FakeRecordStore {
    fn default() -> Self {
        Self {
            zone: ZoneHandle::new(TEST_ZONE),
            records: Mutex::default(),
            creates: Mutex::default(),
            updates: Mutex::default(),
            lists: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            failing_hosts: Mutex::default(),
            fail_list: AtomicBool::new(false),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl FakeRecordStore {
    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        let store = Self::default();
        *store.records.lock().unwrap() = records;
        store
    }

    pub fn fail_writes_for(&self, hostname: &str) {
        self.failing_hosts
            .lock()
            .unwrap()
            .insert(hostname.to_string());
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn content_of(&self, hostname: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| names_match(&r.name, hostname))
            .map(|r| r.content.clone())
    }

    fn check_write(&self, hostname: &str, operation: RecordOperation) -> Result<(), ProviderError> {
        if self.failing_hosts.lock().unwrap().contains(hostname) {
            return Err(provider_failure(operation, 500));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsRecordStore for FakeRecordStore {
    fn zone(&self) -> &ZoneHandle {
        &self.zone
    }

    async fn list(&self) -> Result<Vec<DnsRecord>, ProviderError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(provider_failure(RecordOperation::List, 500));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn get(&self, id: &str) -> Result<DnsRecord, ProviderError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| provider_failure(RecordOperation::Get, 404))
    }

    async fn create(&self, record: &RecordRequest) -> Result<(), ProviderError> {
        self.check_write(&record.name, RecordOperation::Create)?;
        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(DnsRecord {
            id,
            name: record.name.clone(),
            content: record.content.clone(),
            record_type: Some(RecordType::A),
            ttl: record.ttl,
            proxied: record.proxied,
        });
        self.creates.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn update(&self, id: &str, record: &RecordRequest) -> Result<DnsRecord, ProviderError> {
        self.check_write(&record.name, RecordOperation::Update)?;
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| provider_failure(RecordOperation::Update, 404))?;
        existing.name = record.name.clone();
        existing.content = record.content.clone();
        existing.ttl = record.ttl;
        existing.proxied = record.proxied;
        let updated = existing.clone();
        self.updates
            .lock()
            .unwrap()
            .push((id.to_string(), record.clone()));
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }
}

/// Resolver returning a settable address.
pub struct FakeResolver {
    pub ip: Mutex<Ipv4Addr>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeResolver {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip: Mutex::new(ip),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set(&self, ip: Ipv4Addr) {
        *self.ip.lock().unwrap() = ip;
    }
}

#[async_trait]
impl PublicIpResolver for FakeResolver {
    async fn resolve(&self) -> Result<Ipv4Addr, PublicIpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublicIpError::Protocol {
                url: "fake://ip".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(*self.ip.lock().unwrap())
    }
}

pub fn snapshot(
    namespace: &str,
    name: &str,
    labels: &[&str],
    hosts: &[Option<&str>],
) -> IngressSnapshot {
    IngressSnapshot {
        reference: IngressRef::new(namespace, name),
        labels: labels
            .iter()
            .map(|k| ((*k).to_string(), String::new()))
            .collect::<BTreeMap<_, _>>(),
        rule_hosts: hosts.iter().map(|h| h.map(str::to_string)).collect(),
    }
}

/// Cluster held in memory. Acknowledging removes `sentinel` from the snapshot.
pub struct FakeIngressSource {
    pub sentinel: String,
    pub ingresses: Mutex<Vec<IngressSnapshot>>,
    pub acknowledged: Mutex<Vec<IngressRef>>,
    pub lists: AtomicUsize,
    /// Number of upcoming list calls that fail
    pub failing_lists: AtomicUsize,
    /// Upcoming list calls hang past any timeout
    pub hang_lists: AtomicBool,
    pub fail_acknowledge: AtomicBool,
}

impl FakeIngressSource {
    pub fn new(sentinel: &str, ingresses: Vec<IngressSnapshot>) -> Self {
        Self {
            sentinel: sentinel.to_string(),
            ingresses: Mutex::new(ingresses),
            acknowledged: Mutex::new(Vec::new()),
            lists: AtomicUsize::new(0),
            failing_lists: AtomicUsize::new(0),
            hang_lists: AtomicBool::new(false),
            fail_acknowledge: AtomicBool::new(false),
        }
    }

    pub fn acknowledged(&self) -> Vec<IngressRef> {
        self.acknowledged.lock().unwrap().clone()
    }

    pub fn has_label(&self, reference: &IngressRef) -> bool {
        self.ingresses
            .lock()
            .unwrap()
            .iter()
            .any(|i| &i.reference == reference && i.has_label(&self.sentinel))
    }
}

#[async_trait]
impl IngressHostSource for FakeIngressSource {
    async fn list_ingresses(&self) -> Result<Vec<IngressSnapshot>, ClusterError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.hang_lists.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let failing = self.failing_lists.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_lists.store(failing - 1, Ordering::SeqCst);
            return Err(ClusterError::Timeout {
                operation: "list ingresses".to_string(),
                timeout: Duration::from_secs(10),
            });
        }
        Ok(self.ingresses.lock().unwrap().clone())
    }

    async fn acknowledge(&self, reference: &IngressRef) -> Result<Acknowledgement, ClusterError> {
        if self.fail_acknowledge.load(Ordering::SeqCst) {
            return Err(ClusterError::ConflictRetriesExhausted {
                namespace: reference.namespace.clone(),
                name: reference.name.clone(),
                attempts: 5,
            });
        }
        self.acknowledged.lock().unwrap().push(reference.clone());

        let mut ingresses = self.ingresses.lock().unwrap();
        let Some(ingress) = ingresses.iter_mut().find(|i| &i.reference == reference) else {
            return Ok(Acknowledgement::Gone);
        };
        if ingress.labels.remove(&self.sentinel).is_some() {
            Ok(Acknowledgement::Cleared)
        } else {
            Ok(Acknowledgement::AlreadyCleared)
        }
    }
}
