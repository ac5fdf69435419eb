// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the tick orchestration in `reconcilers/mod.rs`

#[cfg(test)]
mod tests {
    use super::super::{ApplyReport, Reconciler, TickReport, ZoneOutcome};
    use crate::config::ZoneConfig;
    use crate::errors::{Service, SyncError};
    use crate::test_support::{healthy, ip, node, zone_config, Call, FakeDnsProvider, FakeHealthSource};
    use crate::zones::ZoneCache;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn reconciler(
        health: &Arc<FakeHealthSource>,
        provider: &Arc<FakeDnsProvider>,
        zones: Vec<ZoneConfig>,
    ) -> Reconciler {
        Reconciler::new(health.clone(), provider.clone(), zones, ZoneCache::default())
    }

    fn ips(list: &[&str]) -> BTreeSet<std::net::IpAddr> {
        list.iter().map(|s| ip(s)).collect()
    }

    /// Healthy unpublished IP is added, unhealthy published IP is removed
    #[tokio::test]
    async fn test_adds_healthy_ip_and_removes_unhealthy_ip() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        let stale = provider.add_record("z1", "proxy.example.com", "5.6.7.8", 120, false);
        let health = Arc::new(FakeHealthSource::new(vec![healthy("1.2.3.4")]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4", "5.6.7.8"])],
        );
        r.startup().await.unwrap();
        provider.clear_calls();

        let report = r.run_tick().await;

        assert_eq!(
            report.outcome("proxy.example.com"),
            Some(&ZoneOutcome::Applied(ApplyReport {
                added: 1,
                removed: 1,
                ..ApplyReport::default()
            }))
        );
        assert_eq!(
            provider.mutations(),
            vec![
                Call::Create {
                    zone_id: "z1".into(),
                    name: "proxy.example.com".into(),
                    ip: ip("1.2.3.4")
                },
                Call::Delete {
                    zone_id: "z1".into(),
                    record_id: stale
                },
            ]
        );
        assert_eq!(provider.ips("z1", "proxy.example.com"), ips(&["1.2.3.4"]));
    }

    #[tokio::test]
    async fn test_disabled_node_is_withdrawn() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.add_record("z1", "proxy.example.com", "1.2.3.4", 120, false);
        provider.add_record("z1", "proxy.example.com", "5.6.7.8", 120, false);
        let health = Arc::new(FakeHealthSource::new(vec![
            node("1.2.3.4", true, true, Some("1.8.4")),
            healthy("5.6.7.8"),
        ]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4", "5.6.7.8"])],
        );
        r.startup().await.unwrap();

        r.run_tick().await;

        assert_eq!(provider.ips("z1", "proxy.example.com"), ips(&["5.6.7.8"]));
    }

    #[tokio::test]
    async fn test_health_failure_skips_tick_without_provider_calls() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.add_record("z1", "proxy.example.com", "1.2.3.4", 120, false);
        let health = Arc::new(FakeHealthSource::new(vec![]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4"])],
        );
        r.startup().await.unwrap();
        provider.clear_calls();
        health.fail_with(SyncError::Transient {
            service: Service::Inventory,
            status: Some(502),
            detail: "bad gateway".into(),
            retryable: true,
        });

        let report = r.run_tick().await;

        assert!(report.is_skipped());
        assert!(report.zones().is_empty());
        assert!(provider.calls().is_empty());
        assert_eq!(provider.ips("z1", "proxy.example.com"), ips(&["1.2.3.4"]));
    }

    /// Rejected inventory credentials mid-run skip the tick like any transient failure
    #[tokio::test]
    async fn test_health_auth_failure_mid_run_skips_tick() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        let health = Arc::new(FakeHealthSource::new(vec![healthy("1.2.3.4")]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4"])],
        );
        r.startup().await.unwrap();
        provider.clear_calls();
        health.fail_with(SyncError::Authentication {
            service: Service::Inventory,
            status: 401,
            detail: "token revoked".into(),
        });

        let report = r.run_tick().await;

        assert!(matches!(
            report,
            TickReport::Skipped(SyncError::Authentication { .. })
        ));
        assert!(provider.calls().is_empty());

        health.set_nodes(vec![healthy("1.2.3.4")]);
        r.run_tick().await;
        assert_eq!(provider.ips("z1", "proxy.example.com"), ips(&["1.2.3.4"]));
    }

    #[tokio::test]
    async fn test_ambiguous_domain_is_disabled_and_others_reconciled() {
        let provider = Arc::new(
            FakeDnsProvider::new()
                .with_zone("good.com", "z-good")
                .with_zone("dup.com", "z-a")
                .with_zone("dup.com", "z-b"),
        );
        let health = Arc::new(FakeHealthSource::new(vec![healthy("1.2.3.4")]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![
                zone_config("dup.com", "proxy", &["1.2.3.4"]),
                zone_config("good.com", "proxy", &["1.2.3.4"]),
            ],
        );
        r.startup().await.unwrap();
        assert!(r.cache().is_disabled("dup.com"));
        provider.clear_calls();

        let report = r.run_tick().await;

        assert_eq!(report.outcome("proxy.dup.com"), Some(&ZoneOutcome::Disabled));
        assert_eq!(provider.ips("z-good", "proxy.good.com"), ips(&["1.2.3.4"]));
        assert!(provider.calls().iter().all(|c| match c {
            Call::ListZones(_) => false,
            Call::ListRecords { zone_id, .. }
            | Call::Create { zone_id, .. }
            | Call::Update { zone_id, .. }
            | Call::Delete { zone_id, .. } => zone_id == "z-good",
        }));
    }

    #[tokio::test]
    async fn test_second_tick_is_idempotent() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.add_record("z1", "proxy.example.com", "9.9.9.9", 120, false);
        let health = Arc::new(FakeHealthSource::new(vec![
            healthy("1.2.3.4"),
            healthy("5.6.7.8"),
        ]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4", "5.6.7.8", "9.9.9.9"])],
        );
        r.startup().await.unwrap();

        r.run_tick().await;
        provider.clear_calls();
        let report = r.run_tick().await;

        assert!(provider.mutations().is_empty());
        assert_eq!(
            report.outcome("proxy.example.com"),
            Some(&ZoneOutcome::InSync)
        );
        assert_eq!(
            provider.ips("z1", "proxy.example.com"),
            ips(&["1.2.3.4", "5.6.7.8"])
        );
    }

    #[tokio::test]
    async fn test_listing_failure_in_one_zone_does_not_block_another() {
        let provider = Arc::new(
            FakeDnsProvider::new()
                .with_zone("a.com", "z-a")
                .with_zone("b.com", "z-b"),
        );
        provider.fail_listing("z-b", SyncError::transport(Service::DnsProvider, "reset"));
        let health = Arc::new(FakeHealthSource::new(vec![healthy("1.2.3.4")]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![
                zone_config("b.com", "proxy", &["1.2.3.4"]),
                zone_config("a.com", "proxy", &["1.2.3.4"]),
            ],
        );
        r.startup().await.unwrap();

        let report = r.run_tick().await;

        assert!(matches!(
            report.outcome("proxy.b.com"),
            Some(ZoneOutcome::Failed(SyncError::Transient { .. }))
        ));
        assert_eq!(provider.ips("z-a", "proxy.a.com"), ips(&["1.2.3.4"]));

        provider.clear_listing_failure("z-b");
        r.run_tick().await;
        assert_eq!(provider.ips("z-b", "proxy.b.com"), ips(&["1.2.3.4"]));
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_stop_the_rest() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.add_record("z1", "proxy.example.com", "9.9.9.9", 120, false);
        provider.fail_create(
            "1.1.1.1",
            SyncError::Transient {
                service: Service::DnsProvider,
                status: Some(400),
                detail: "record already exists".into(),
                retryable: false,
            },
        );
        let health = Arc::new(FakeHealthSource::new(vec![
            healthy("1.1.1.1"),
            healthy("2.2.2.2"),
        ]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.1.1.1", "2.2.2.2", "9.9.9.9"])],
        );
        r.startup().await.unwrap();

        let report = r.run_tick().await;

        assert_eq!(
            report.outcome("proxy.example.com"),
            Some(&ZoneOutcome::Applied(ApplyReport {
                added: 1,
                updated: 0,
                removed: 1,
                failed: 1,
            }))
        );
        assert_eq!(provider.ips("z1", "proxy.example.com"), ips(&["2.2.2.2"]));
    }

    #[tokio::test]
    async fn test_duplicates_removed_and_drift_updated() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.add_record("z1", "proxy.example.com", "1.1.1.1", 120, false);
        provider.add_record("z1", "proxy.example.com", "1.1.1.1", 120, false);
        let drifted = provider.add_record("z1", "proxy.example.com", "2.2.2.2", 3600, false);
        let health = Arc::new(FakeHealthSource::new(vec![
            healthy("1.1.1.1"),
            healthy("2.2.2.2"),
        ]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.1.1.1", "2.2.2.2"])],
        );
        r.startup().await.unwrap();

        r.run_tick().await;

        let records = provider.records("z1", "proxy.example.com");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|rec| rec.ttl == 120));
        assert!(records.iter().any(|rec| rec.id == drifted));
    }

    #[tokio::test]
    async fn test_records_with_other_names_are_untouched() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.add_record("z1", "www.example.com", "7.7.7.7", 300, true);
        let health = Arc::new(FakeHealthSource::new(vec![]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["7.7.7.7"])],
        );
        r.startup().await.unwrap();

        r.run_tick().await;

        assert!(provider.mutations().is_empty());
        assert_eq!(provider.ips("z1", "www.example.com"), ips(&["7.7.7.7"]));
    }

    #[tokio::test]
    async fn test_pending_zone_is_resolved_on_a_later_tick() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.fail_zone_lookup(
            "example.com",
            SyncError::transport(Service::DnsProvider, "timeout"),
        );
        let health = Arc::new(FakeHealthSource::new(vec![healthy("1.2.3.4")]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4"])],
        );
        r.startup().await.unwrap();

        let first = r.run_tick().await;
        assert_eq!(
            first.outcome("proxy.example.com"),
            Some(&ZoneOutcome::Unresolved)
        );

        provider.clear_zone_failure("example.com");
        r.run_tick().await;

        assert_eq!(r.cache().zone_id("example.com"), Some("z1"));
        assert_eq!(provider.ips("z1", "proxy.example.com"), ips(&["1.2.3.4"]));
    }

    /// A pending zone that turns out to be missing disables the last usable
    /// zone; that is reported once, not on every following tick
    #[tokio::test]
    async fn test_losing_last_usable_zone_is_reported_once() {
        let provider = Arc::new(FakeDnsProvider::new());
        provider.fail_zone_lookup(
            "example.com",
            SyncError::transport(Service::DnsProvider, "timeout"),
        );
        let health = Arc::new(FakeHealthSource::new(vec![healthy("1.2.3.4")]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4"])],
        );
        r.startup().await.unwrap();
        assert!(r.has_usable_zones);

        provider.clear_zone_failure("example.com");
        r.run_tick().await;
        assert!(r.cache().is_disabled("example.com"));
        assert!(!r.has_usable_zones);

        r.run_tick().await;
        assert!(!r.publish_zone_states());
        assert!(provider.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_startup_fails_when_no_zone_is_usable() {
        let provider = Arc::new(FakeDnsProvider::new());
        let health = Arc::new(FakeHealthSource::new(vec![]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("missing.com", "proxy", &["1.2.3.4"])],
        );

        let result = r.startup().await;

        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_startup_fails_on_rejected_provider_token() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        provider.fail_zone_lookup(
            "example.com",
            SyncError::Authentication {
                service: Service::DnsProvider,
                status: 403,
                detail: "Invalid API Token".into(),
            },
        );
        let health = Arc::new(FakeHealthSource::new(vec![]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![zone_config("example.com", "proxy", &["1.2.3.4"])],
        );

        assert!(matches!(
            r.startup().await,
            Err(SyncError::Authentication { .. })
        ));
        assert_eq!(health.calls(), 0);
    }

    /// Zones sharing a domain trigger a single zone lookup
    #[tokio::test]
    async fn test_shared_domain_resolved_once() {
        let provider = Arc::new(FakeDnsProvider::new().with_zone("example.com", "z1"));
        let health = Arc::new(FakeHealthSource::new(vec![healthy("1.2.3.4"), healthy("5.6.7.8")]));
        let mut r = reconciler(
            &health,
            &provider,
            vec![
                zone_config("example.com", "proxy", &["1.2.3.4"]),
                zone_config("example.com", "@", &["5.6.7.8"]),
            ],
        );

        r.startup().await.unwrap();
        r.run_tick().await;

        let lookups = provider
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ListZones(_)))
            .count();
        assert_eq!(lookups, 1);
        assert_eq!(provider.ips("z1", "example.com"), ips(&["5.6.7.8"]));
        assert_eq!(provider.ips("z1", "proxy.example.com"), ips(&["1.2.3.4"]));
    }
}
