// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Actual state: the address records the provider currently publishes.

use crate::config::ZoneConfig;
use crate::errors::SyncError;
use crate::provider::{AddressRecord, DnsProvider};
use std::collections::BTreeSet;
use std::net::IpAddr;
use tracing::debug;

/// Records published for one managed record name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActualRecords {
    pub records: Vec<AddressRecord>,
}

impl ActualRecords {
    /// Distinct IPs currently published.
    #[must_use]
    pub fn ips(&self) -> BTreeSet<IpAddr> {
        self.records.iter().map(|r| r.ip).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetch the A/AAAA records of `zone` from provider zone `zone_id`.
///
/// Only records whose name equals the zone's fully-qualified record name are
/// returned. Every call goes to the provider; nothing is cached.
///
/// # Errors
///
/// Returns the provider error when any page cannot be listed.
pub async fn fetch_actual(
    provider: &dyn DnsProvider,
    zone_id: &str,
    zone: &ZoneConfig,
) -> Result<ActualRecords, SyncError> {
    let record_name = zone.record_name();
    let records = provider.list_address_records(zone_id, &record_name).await?;

    debug!(
        record = %record_name,
        zone_id = %zone_id,
        count = records.len(),
        "Fetched published records"
    );

    Ok(ActualRecords {
        records: records
            .into_iter()
            .filter(|r| r.name.eq_ignore_ascii_case(&record_name))
            .collect(),
    })
}

#[cfg(test)]
#[path = "actual_tests.rs"]
mod actual_tests;
