// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of published address records against fleet health.
//!
//! # Reconciliation Architecture
//!
//! One [`Reconciler::run_tick`] call is one observe → diff → apply cycle:
//!
//! 1. **Observe** - Fetch one health snapshot. If it fails the whole tick is
//!    skipped before any provider call is made.
//! 2. **Resolve** - Retry zone lookups that failed transiently earlier.
//! 3. **Diff** - Per zone, compute the desired IPs ([`desired`]) and fetch the
//!    published records ([`actual`]), then build a [`plan::ChangePlan`].
//! 4. **Apply** - Create, update and delete records one call at a time.
//!
//! Zones are reconciled concurrently and independently: a failure in one zone
//! is logged and counted but never stops another zone.
//!
//! # Example
//!
//! ```rust,no_run
//! use remnadns::reconcilers::Reconciler;
//! use remnadns::zones::ZoneCache;
//! # use remnadns::inventory::HealthSource;
//! # use remnadns::provider::DnsProvider;
//! # use std::sync::Arc;
//!
//! # async fn example(
//! #     health: Arc<dyn HealthSource>,
//! #     provider: Arc<dyn DnsProvider>,
//! #     zones: Vec<remnadns::config::ZoneConfig>,
//! # ) -> Result<(), remnadns::errors::SyncError> {
//! let mut reconciler = Reconciler::new(health, provider, zones, ZoneCache::default());
//! reconciler.startup().await?;
//! let report = reconciler.run_tick().await;
//! println!("{} zones reconciled", report.zones().len());
//! # Ok(())
//! # }
//! ```

pub mod actual;
pub mod desired;
pub mod plan;

use crate::config::{distinct_domains, ZoneConfig};
use crate::errors::SyncError;
use crate::inventory::HealthSource;
use crate::metrics;
use crate::node::Node;
use crate::provider::{DnsProvider, NewAddressRecord};
use crate::zones::{ResolutionPhase, ZoneCache, ZoneResolver, ZoneState};
use actual::fetch_actual;
use desired::{compute_desired, HealthIndex, ZoneStatus};
use futures::future::join_all;
use plan::{plan_changes, ChangePlan};
use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Counts of mutations attempted for one zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Mutations the provider rejected; retried next tick
    pub failed: usize,
}

/// Result of reconciling one configured zone in one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneOutcome {
    /// Published records already matched the desired state
    InSync,
    /// Mutations were attempted
    Applied(ApplyReport),
    /// Domain has no usable provider zone until restart
    Disabled,
    /// Domain lookup has not succeeded yet
    Unresolved,
    /// Published records could not be listed
    Failed(SyncError),
}

/// Per-zone entry of a [`TickReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneReport {
    pub record_name: String,
    pub outcome: ZoneOutcome,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// No health snapshot; nothing was attempted
    Skipped(SyncError),
    /// Every zone was visited
    Completed(Vec<ZoneReport>),
}

impl TickReport {
    /// Zone entries, empty for a skipped tick.
    #[must_use]
    pub fn zones(&self) -> &[ZoneReport] {
        match self {
            TickReport::Skipped(_) => &[],
            TickReport::Completed(zones) => zones,
        }
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, TickReport::Skipped(_))
    }

    /// Outcome for the zone managing `record_name`.
    #[must_use]
    pub fn outcome(&self, record_name: &str) -> Option<&ZoneOutcome> {
        self.zones()
            .iter()
            .find(|z| z.record_name == record_name)
            .map(|z| &z.outcome)
    }
}

/// Owns the collaborators, the static zone configuration and the zone cache.
pub struct Reconciler {
    health: Arc<dyn HealthSource>,
    provider: Arc<dyn DnsProvider>,
    resolver: ZoneResolver,
    zones: Vec<ZoneConfig>,
    domains: Vec<String>,
    cache: ZoneCache,
    has_usable_zones: bool,
}

impl Reconciler {
    /// Build a reconciler. `cache` may be pre-populated with known zone ids.
    #[must_use]
    pub fn new(
        health: Arc<dyn HealthSource>,
        provider: Arc<dyn DnsProvider>,
        zones: Vec<ZoneConfig>,
        cache: ZoneCache,
    ) -> Self {
        let domains = distinct_domains(&zones);

        Self {
            health,
            resolver: ZoneResolver::new(provider.clone()),
            provider,
            zones,
            domains,
            cache,
            has_usable_zones: true,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ZoneCache {
        &self.cache
    }

    /// Resolve every configured domain and log the managed inventory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Authentication`] when the DNS provider rejects the
    /// credential, or [`SyncError::Configuration`] when no domain is resolved or
    /// still pending afterwards.
    pub async fn startup(&mut self) -> Result<(), SyncError> {
        info!(
            domains = self.domains.len(),
            zones = self.zones.len(),
            "Resolving provider zones"
        );
        self.resolver
            .resolve_into(&mut self.cache, &self.domains, ResolutionPhase::Startup)
            .await?;
        self.publish_zone_states();

        let disabled: Vec<&str> = self
            .domains
            .iter()
            .filter(|d| self.cache.is_disabled(d))
            .map(String::as_str)
            .collect();
        if !disabled.is_empty() {
            warn!(domains = ?disabled, "Skipping domains without a unique provider zone");
        }

        if self.cache.resolved_count() + self.cache.pending_count() == 0 {
            return Err(SyncError::Configuration(
                "no configured domain resolved to a provider zone".into(),
            ));
        }

        self.log_inventory().await;
        Ok(())
    }

    /// Run one observe → diff → apply cycle.
    pub async fn run_tick(&mut self) -> TickReport {
        let started = Instant::now();

        let nodes = match self.health.fetch_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(
                    error = %e,
                    kind = e.kind(),
                    "Health snapshot unavailable, skipping tick"
                );
                metrics::record_tick_skipped();
                return TickReport::Skipped(e);
            }
        };
        let health = HealthIndex::from_nodes(&nodes);
        self.log_health_summary(&nodes, &health);

        if let Err(e) = self
            .resolver
            .resolve_into(&mut self.cache, &self.domains, ResolutionPhase::Tick)
            .await
        {
            warn!(error = %e, "Zone resolution failed");
        }
        self.publish_zone_states();

        let this = &*self;
        let reports = join_all(
            this.zones
                .iter()
                .map(|zone| this.reconcile_zone(zone, &health)),
        )
        .await;

        metrics::record_tick_completed(started.elapsed());
        debug!(
            zones = reports.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Tick completed"
        );
        TickReport::Completed(reports)
    }

    async fn reconcile_zone(&self, zone: &ZoneConfig, health: &HealthIndex) -> ZoneReport {
        let record_name = zone.record_name();
        let outcome = self.reconcile_zone_outcome(zone, &record_name, health).await;
        ZoneReport {
            record_name,
            outcome,
        }
    }

    async fn reconcile_zone_outcome(
        &self,
        zone: &ZoneConfig,
        record_name: &str,
        health: &HealthIndex,
    ) -> ZoneOutcome {
        let zone_id = match self.cache.state(&zone.domain) {
            Some(ZoneState::Resolved(id)) => id.as_str(),
            Some(ZoneState::Disabled { .. }) => {
                debug!(record = %record_name, domain = %zone.domain, "Zone disabled, skipping");
                return ZoneOutcome::Disabled;
            }
            Some(ZoneState::Pending { last_error }) => {
                warn!(
                    record = %record_name,
                    domain = %zone.domain,
                    error = %last_error,
                    "Provider zone not resolved yet, skipping zone"
                );
                return ZoneOutcome::Unresolved;
            }
            None => return ZoneOutcome::Unresolved,
        };

        let desired = compute_desired(zone, health);
        metrics::set_desired_ips(record_name, desired.len());

        let actual = match fetch_actual(self.provider.as_ref(), zone_id, zone).await {
            Ok(actual) => actual,
            Err(e) => {
                warn!(
                    record = %record_name,
                    domain = %zone.domain,
                    zone_id = %zone_id,
                    error = %e,
                    "Failed to list published records, skipping zone"
                );
                metrics::record_zone_failure(record_name, e.kind());
                return ZoneOutcome::Failed(e);
            }
        };

        let plan = plan_changes(zone, &desired, &actual.records);
        if plan.is_empty() {
            let status = ZoneStatus::new(zone, &desired);
            info!(
                record = %record_name,
                domain = %zone.domain,
                status = %status,
                offline = ?status.offline,
                "Zone in sync"
            );
            return ZoneOutcome::InSync;
        }

        info!(
            record = %record_name,
            domain = %zone.domain,
            add = plan.to_add.len(),
            update = plan.to_update.len(),
            remove = plan.to_remove.len(),
            "Applying record changes"
        );
        let report = self.apply(zone, record_name, zone_id, &plan).await;
        if report.failed > 0 {
            metrics::record_zone_failure(record_name, "mutation");
        }
        ZoneOutcome::Applied(report)
    }

    /// Apply `plan` one mutation at a time. Failures are logged and counted;
    /// the remaining mutations still run.
    async fn apply(
        &self,
        zone: &ZoneConfig,
        record_name: &str,
        zone_id: &str,
        plan: &ChangePlan,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for ip in &plan.to_add {
            let new_record = NewAddressRecord {
                name: record_name.to_string(),
                ip: *ip,
                ttl: zone.ttl,
                proxied: zone.proxied,
            };
            match self
                .provider
                .create_address_record(zone_id, &new_record)
                .await
            {
                Ok(created) => {
                    info!(
                        record = %record_name,
                        domain = %zone.domain,
                        ip = %ip,
                        record_type = %new_record.record_type(),
                        ttl = zone.ttl,
                        proxied = zone.proxied,
                        record_id = %created.id,
                        "Added address record"
                    );
                    metrics::record_record_change(record_name, "added");
                    report.added += 1;
                }
                Err(e) => {
                    warn!(
                        record = %record_name,
                        domain = %zone.domain,
                        ip = %ip,
                        error = %e,
                        "Failed to add address record"
                    );
                    metrics::record_mutation_failure(record_name, "added");
                    report.failed += 1;
                }
            }
        }

        for record in &plan.to_update {
            match self
                .provider
                .update_address_record(zone_id, &record.id, zone.ttl, zone.proxied)
                .await
            {
                Ok(_) => {
                    info!(
                        record = %record_name,
                        domain = %zone.domain,
                        ip = %record.ip,
                        record_id = %record.id,
                        ttl = zone.ttl,
                        proxied = zone.proxied,
                        previous_ttl = record.ttl,
                        previous_proxied = record.proxied,
                        "Updated address record"
                    );
                    metrics::record_record_change(record_name, "updated");
                    report.updated += 1;
                }
                Err(e) => {
                    warn!(
                        record = %record_name,
                        domain = %zone.domain,
                        ip = %record.ip,
                        record_id = %record.id,
                        error = %e,
                        "Failed to update address record"
                    );
                    metrics::record_mutation_failure(record_name, "updated");
                    report.failed += 1;
                }
            }
        }

        for record in &plan.to_remove {
            match self.provider.delete_record(zone_id, &record.id).await {
                Ok(()) => {
                    info!(
                        record = %record_name,
                        domain = %zone.domain,
                        ip = %record.ip,
                        record_id = %record.id,
                        "Removed address record"
                    );
                    metrics::record_record_change(record_name, "removed");
                    report.removed += 1;
                }
                Err(e) => {
                    warn!(
                        record = %record_name,
                        domain = %zone.domain,
                        ip = %record.ip,
                        record_id = %record.id,
                        error = %e,
                        "Failed to remove address record"
                    );
                    metrics::record_mutation_failure(record_name, "removed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Log every managed zone and the records it currently publishes.
    async fn log_inventory(&self) {
        for zone in &self.zones {
            let record_name = zone.record_name();
            let Some(zone_id) = self.cache.zone_id(&zone.domain) else {
                continue;
            };

            info!(
                record = %record_name,
                zone_id = %zone_id,
                ttl = zone.ttl,
                proxied = zone.proxied,
                ips = ?zone.ips,
                "Managing zone"
            );

            match fetch_actual(self.provider.as_ref(), zone_id, zone).await {
                Ok(actual) if actual.is_empty() => {
                    info!(record = %record_name, "No address records published yet");
                }
                Ok(actual) => {
                    for record in &actual.records {
                        info!(
                            record = %record_name,
                            ip = %record.ip,
                            ttl = record.ttl,
                            proxied = record.proxied,
                            record_id = %record.id,
                            "Published address record"
                        );
                    }
                }
                Err(e) => {
                    warn!(record = %record_name, error = %e, "Could not list published records");
                }
            }
        }
    }

    fn log_health_summary(&self, nodes: &[Node], health: &HealthIndex) {
        let configured: HashSet<IpAddr> = self
            .zones
            .iter()
            .flat_map(|z| z.ips.iter().copied())
            .collect();
        let healthy = nodes.iter().filter(|n| n.is_healthy()).count();
        metrics::set_node_health(healthy, nodes.len() - healthy);

        info!(
            nodes = nodes.len(),
            healthy,
            unhealthy = nodes.len() - healthy,
            "Health snapshot"
        );

        for node in nodes.iter().filter(|n| !n.is_healthy()) {
            if node.ip().is_some_and(|ip| configured.contains(&ip)) {
                warn!(
                    node = %node.display_name(),
                    address = %node.address,
                    reasons = %node.unhealthy_reasons().join(", "),
                    "Node unhealthy"
                );
            }
        }

        let unreported: BTreeSet<&IpAddr> = configured
            .iter()
            .filter(|ip| !health.is_reported(ip))
            .collect();
        if !unreported.is_empty() {
            warn!(ips = ?unreported, "Configured IPs not reported by any node");
        }
    }

    /// Export zone state gauges. Returns `true` only on the call that finds the
    /// last usable zone gone, which is also the only call that logs it.
    fn publish_zone_states(&mut self) -> bool {
        metrics::set_zone_states(
            self.cache.resolved_count(),
            self.cache.pending_count(),
            self.cache.disabled_count(),
        );
        let usable = self.cache.resolved_count() + self.cache.pending_count() > 0;
        let lost = self.has_usable_zones && !usable;
        if lost {
            error!("No usable provider zones");
        }
        self.has_usable_zones = usable;
        lost
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
