// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the sync loops.

#[cfg(test)]
mod tests {
    use crate::context::{Context, SyncSettings};
    use crate::errors::ClusterError;
    use crate::ingress::IngressRef;
    use crate::reconcilers::DnsReconciler;
    use crate::sync::{
        full_sync_once, label_trigger_once, list_hosts_with_timeout, run_full_sync_loop,
        run_label_trigger_loop, SyncReport,
    };
    use crate::testing::{a_record, snapshot, FakeIngressSource, FakeRecordStore, FakeResolver};
    use std::net::Ipv4Addr;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    const IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 9);
    const LABEL: &str = "kubehomedns";

    struct Harness {
        store: Arc<FakeRecordStore>,
        ingresses: Arc<FakeIngressSource>,
        ctx: Arc<Context>,
    }

    fn harness(store: FakeRecordStore, ingresses: FakeIngressSource) -> Harness {
        let store = Arc::new(store);
        let ingresses = Arc::new(ingresses);
        let reconciler = DnsReconciler::new(store.clone(), Arc::new(FakeResolver::new(IP)));
        let ctx = Arc::new(Context::new(
            ingresses.clone(),
            Arc::new(reconciler),
            SyncSettings::default(),
        ));
        Harness {
            store,
            ingresses,
            ctx,
        }
    }

    // ========== Full sync ==========

    #[tokio::test]
    async fn test_full_sync_reconciles_every_rule_host() {
        let h = harness(
            FakeRecordStore::with_records(vec![a_record("r1", "b.example.com", "203.0.113.9")]),
            FakeIngressSource::new(
                LABEL,
                vec![
                    snapshot("web", "one", &[], &[Some("a.example.com"), None]),
                    snapshot("web", "two", &[], &[Some("b.example.com"), Some("c.example.com")]),
                    snapshot("web", "empty", &[], &[None]),
                ],
            ),
        );

        let report = full_sync_once(&h.ctx).await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                attempted: 3,
                created: 2,
                unchanged: 1,
                ..SyncReport::default()
            }
        );
        assert_eq!(h.store.content_of("a.example.com").as_deref(), Some("203.0.113.9"));
        assert_eq!(h.store.content_of("c.example.com").as_deref(), Some("203.0.113.9"));
        assert!(h.ingresses.acknowledged().is_empty());
    }

    #[tokio::test]
    async fn test_list_hosts_pairs_each_host_with_its_ingress() {
        let h = harness(
            FakeRecordStore::default(),
            FakeIngressSource::new(
                LABEL,
                vec![
                    snapshot("web", "one", &[LABEL], &[None, Some("a.example.com")]),
                    snapshot("blog", "two", &[], &[Some("b.example.com")]),
                ],
            ),
        );

        let hosts = list_hosts_with_timeout(&h.ctx).await.unwrap();

        let pairs: Vec<_> = hosts
            .iter()
            .map(|host| (host.ingress_ref(), host.host.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (IngressRef::new("web", "one"), "a.example.com"),
                (IngressRef::new("blog", "two"), "b.example.com"),
            ]
        );
        assert!(hosts[0].labels.contains_key(LABEL));
        assert_eq!(h.ingresses.lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_sync_failure_does_not_stop_cycle() {
        let store = FakeRecordStore::default();
        store.fail_writes_for("a.example.com");
        let h = harness(
            store,
            FakeIngressSource::new(
                LABEL,
                vec![snapshot(
                    "web",
                    "site",
                    &[],
                    &[Some("a.example.com"), Some("b.example.com")],
                )],
            ),
        );

        let report = full_sync_once(&h.ctx).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
        assert_eq!(h.store.content_of("a.example.com"), None);
        assert_eq!(h.store.content_of("b.example.com").as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_full_sync_list_error_is_returned() {
        let ingresses = FakeIngressSource::new(LABEL, vec![]);
        ingresses.failing_lists.store(1, Ordering::SeqCst);
        let h = harness(FakeRecordStore::default(), ingresses);

        let err = full_sync_once(&h.ctx).await.unwrap_err();
        assert_eq!(err.error_type(), "cluster_timeout");
        assert_eq!(h.store.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_list_times_out() {
        let ingresses = FakeIngressSource::new(LABEL, vec![]);
        ingresses.hang_lists.store(true, Ordering::SeqCst);
        let h = harness(FakeRecordStore::default(), ingresses);

        let err = full_sync_once(&h.ctx).await.unwrap_err();
        match err {
            ClusterError::Timeout { timeout, .. } => assert_eq!(timeout, Duration::from_secs(10)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    // ========== Label trigger ==========

    #[tokio::test]
    async fn test_label_trigger_reconciles_first_host_and_acknowledges() {
        let h = harness(
            FakeRecordStore::default(),
            FakeIngressSource::new(
                LABEL,
                vec![
                    snapshot(
                        "web",
                        "flagged",
                        &[LABEL],
                        &[Some("a.example.com"), Some("second.example.com")],
                    ),
                    snapshot("web", "quiet", &[], &[Some("q.example.com")]),
                ],
            ),
        );

        let report = label_trigger_once(&h.ctx).await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.acknowledged, 1);
        assert_eq!(h.store.create_count(), 1);
        assert_eq!(h.store.creates.lock().unwrap()[0].name, "a.example.com");
        assert_eq!(h.ingresses.acknowledged(), vec![IngressRef::new("web", "flagged")]);
        assert!(!h.ingresses.has_label(&IngressRef::new("web", "flagged")));

        // Consumed: the next cycle finds nothing to do
        let again = label_trigger_once(&h.ctx).await.unwrap();
        assert_eq!(again, SyncReport::default());
        assert_eq!(h.ingresses.acknowledged().len(), 1);
    }

    #[tokio::test]
    async fn test_label_kept_when_reconcile_fails() {
        let store = FakeRecordStore::default();
        store.fail_writes_for("a.example.com");
        let h = harness(
            store,
            FakeIngressSource::new(
                LABEL,
                vec![snapshot("web", "flagged", &[LABEL], &[Some("a.example.com")])],
            ),
        );

        let report = label_trigger_once(&h.ctx).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.acknowledged, 0);
        assert!(h.ingresses.acknowledged().is_empty());
        assert!(h.ingresses.has_label(&IngressRef::new("web", "flagged")));
    }

    #[tokio::test]
    async fn test_label_without_first_host_is_cleared() {
        let h = harness(
            FakeRecordStore::default(),
            FakeIngressSource::new(
                LABEL,
                vec![snapshot("web", "hostless", &[LABEL], &[None, Some("b.example.com")])],
            ),
        );

        let report = label_trigger_once(&h.ctx).await.unwrap();

        assert_eq!(report.attempted, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.acknowledged, 1);
        assert_eq!(h.store.create_count(), 0);
    }

    #[tokio::test]
    async fn test_acknowledge_failure_keeps_dns_change() {
        let ingresses = FakeIngressSource::new(
            LABEL,
            vec![snapshot("web", "flagged", &[LABEL], &[Some("a.example.com")])],
        );
        ingresses.fail_acknowledge.store(true, Ordering::SeqCst);
        let h = harness(FakeRecordStore::default(), ingresses);

        let report = label_trigger_once(&h.ctx).await.unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.acknowledged, 0);
        assert_eq!(h.store.content_of("a.example.com").as_deref(), Some("203.0.113.9"));
    }

    // ========== Loop cadence ==========

    #[tokio::test(start_paused = true)]
    async fn test_full_sync_loop_backs_off_then_waits_interval() {
        let ingresses = FakeIngressSource::new(
            LABEL,
            vec![snapshot("web", "site", &[], &[Some("a.example.com")])],
        );
        ingresses.failing_lists.store(1, Ordering::SeqCst);
        let h = harness(FakeRecordStore::default(), ingresses);

        let handle = tokio::spawn(run_full_sync_loop(h.ctx.clone()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.ingresses.lists.load(Ordering::SeqCst), 1, "first list failed");

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.ingresses.lists.load(Ordering::SeqCst), 2, "retried after backoff");
        assert_eq!(h.store.create_count(), 1);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.ingresses.lists.load(Ordering::SeqCst), 2, "waiting full interval");

        tokio::time::sleep(Duration::from_secs(1800)).await;
        assert_eq!(h.ingresses.lists.load(Ordering::SeqCst), 3);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_label_loop_runs_on_short_interval() {
        let h = harness(
            FakeRecordStore::default(),
            FakeIngressSource::new(LABEL, vec![]),
        );

        let handle = tokio::spawn(run_label_trigger_loop(h.ctx.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.ingresses.lists.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.ingresses.lists.load(Ordering::SeqCst), 2);

        handle.abort();
    }
}
