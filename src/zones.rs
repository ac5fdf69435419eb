// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider zone discovery and the zone identifier cache.
//!
//! Every configured domain must map to exactly one provider zone. Lookups run
//! once per domain; the outcome is stored in a [`ZoneCache`] that the reconciler
//! owns for the lifetime of the process:
//!
//! - **Resolved** entries are never refreshed or invalidated.
//! - **Disabled** entries (zero or several matching zones) stay disabled until
//!   restart and are logged once, when the lookup fails.
//! - **Pending** entries (transient lookup failure) are retried at the start of
//!   the next tick.

use crate::errors::SyncError;
use crate::provider::DnsProvider;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Resolution state of one configured domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneState {
    /// Provider zone identifier
    Resolved(String),
    /// Lookup failed transiently; retried next tick
    Pending { last_error: String },
    /// Lookup was ambiguous or empty; skipped until restart
    Disabled { reason: String },
}

/// When a resolution pass runs, which decides how credential errors are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPhase {
    /// Before the first tick: rejected credentials are fatal
    Startup,
    /// During a tick: rejected credentials are retried like transient errors
    Tick,
}

/// Domain → zone state, written once per domain and read thereafter.
#[derive(Debug, Clone, Default)]
pub struct ZoneCache {
    entries: HashMap<String, ZoneState>,
}

impl ZoneCache {
    /// Cache pre-populated with known zone identifiers.
    #[must_use]
    pub fn with_resolved<I, D, Z>(entries: I) -> Self
    where
        I: IntoIterator<Item = (D, Z)>,
        D: Into<String>,
        Z: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(d, z)| (d.into(), ZoneState::Resolved(z.into())))
                .collect(),
        }
    }

    #[must_use]
    pub fn state(&self, domain: &str) -> Option<&ZoneState> {
        self.entries.get(domain)
    }

    /// Zone identifier for `domain`, when resolved.
    #[must_use]
    pub fn zone_id(&self, domain: &str) -> Option<&str> {
        match self.entries.get(domain) {
            Some(ZoneState::Resolved(id)) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_disabled(&self, domain: &str) -> bool {
        matches!(self.entries.get(domain), Some(ZoneState::Disabled { .. }))
    }

    /// Domains of `domains` that still need a lookup (never tried or pending).
    #[must_use]
    pub fn unresolved<'a>(&self, domains: &'a [String]) -> Vec<&'a str> {
        domains
            .iter()
            .filter(|d| {
                matches!(
                    self.entries.get(d.as_str()),
                    None | Some(ZoneState::Pending { .. })
                )
            })
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ZoneState::Resolved(_)))
            .count()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ZoneState::Pending { .. }))
            .count()
    }

    #[must_use]
    pub fn disabled_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ZoneState::Disabled { .. }))
            .count()
    }

    /// Record a lookup outcome. Resolved and disabled entries are final.
    fn record(&mut self, domain: &str, state: ZoneState) {
        match self.entries.get(domain) {
            Some(ZoneState::Resolved(_) | ZoneState::Disabled { .. }) => {}
            _ => {
                self.entries.insert(domain.to_string(), state);
            }
        }
    }
}

/// Looks up provider zone identifiers for configured domains.
#[derive(Clone)]
pub struct ZoneResolver {
    provider: Arc<dyn DnsProvider>,
}

impl ZoneResolver {
    #[must_use]
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Look up the single provider zone for `domain`, bypassing any cache.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] when zero or more than one zone matches,
    /// or the provider error when the lookup itself fails.
    pub async fn resolve(&self, domain: &str) -> Result<String, SyncError> {
        let mut zones = self.provider.list_zones(domain).await?;
        if zones.len() != 1 {
            return Err(SyncError::NotFound {
                domain: domain.to_string(),
                matches: zones.len(),
            });
        }
        Ok(zones.remove(0).id)
    }

    /// Resolve every domain of `domains` that the cache has not settled yet.
    ///
    /// Lookups run concurrently; results are written to `cache` afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Authentication`] during [`ResolutionPhase::Startup`]
    /// when the provider rejects the credential. All other failures are recorded
    /// in the cache and logged.
    pub async fn resolve_into(
        &self,
        cache: &mut ZoneCache,
        domains: &[String],
        phase: ResolutionPhase,
    ) -> Result<(), SyncError> {
        let pending = cache.unresolved(domains);
        if pending.is_empty() {
            return Ok(());
        }

        let lookups = pending.iter().map(|domain| async move {
            let result = self.resolve(domain).await;
            (*domain, result)
        });
        let results = join_all(lookups).await;

        let mut fatal = None;
        for (domain, result) in results {
            match result {
                Ok(zone_id) => {
                    info!(domain = %domain, zone_id = %zone_id, "Resolved provider zone");
                    cache.record(domain, ZoneState::Resolved(zone_id));
                }
                Err(e @ SyncError::NotFound { .. }) => {
                    error!(
                        domain = %domain,
                        error = %e,
                        "Zone lookup failed, disabling domain until restart"
                    );
                    cache.record(domain, ZoneState::Disabled { reason: e.to_string() });
                }
                Err(e @ SyncError::Authentication { .. }) if phase == ResolutionPhase::Startup => {
                    error!(domain = %domain, error = %e, "DNS provider rejected credentials");
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    warn!(
                        domain = %domain,
                        error = %e,
                        "Zone lookup failed, will retry next tick"
                    );
                    cache.record(domain, ZoneState::Pending { last_error: e.to_string() });
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "zones_tests.rs"]
mod zones_tests;
