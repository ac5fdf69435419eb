// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Diff between desired IPs and published records.
//!
//! The plan is computed against freshly fetched records every tick, so running
//! it again after a successful apply yields an empty plan.

use crate::config::ZoneConfig;
use crate::provider::AddressRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

/// Mutations that bring one record name to its desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePlan {
    /// `Desired - Actual`: IPs that need a new record
    pub to_add: BTreeSet<IpAddr>,
    /// Records of desired IPs whose TTL or proxied flag drifted
    pub to_update: Vec<AddressRecord>,
    /// Records of undesired IPs, plus duplicates of desired ones
    pub to_remove: Vec<AddressRecord>,
}

impl ChangePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    /// `Actual - Desired`: IPs whose records are all removed.
    #[must_use]
    pub fn withdrawn_ips(&self, desired: &BTreeSet<IpAddr>) -> BTreeSet<IpAddr> {
        self.to_remove
            .iter()
            .map(|r| r.ip)
            .filter(|ip| !desired.contains(ip))
            .collect()
    }
}

/// Whether `record` carries the TTL and proxied flag `zone` asks for.
///
/// Proxied records have their TTL managed by the provider, so only the flag is
/// compared for them.
#[must_use]
pub fn attributes_match(record: &AddressRecord, zone: &ZoneConfig) -> bool {
    record.proxied == zone.proxied && (zone.proxied || record.ttl == zone.ttl)
}

/// Compute the mutations for one record name.
///
/// For each desired IP exactly one record survives, preferring one whose
/// attributes already match.
#[must_use]
pub fn plan_changes(
    zone: &ZoneConfig,
    desired: &BTreeSet<IpAddr>,
    actual: &[AddressRecord],
) -> ChangePlan {
    let mut by_ip: BTreeMap<IpAddr, Vec<&AddressRecord>> = BTreeMap::new();
    for record in actual {
        by_ip.entry(record.ip).or_default().push(record);
    }

    let mut plan = ChangePlan {
        to_add: desired
            .iter()
            .filter(|ip| !by_ip.contains_key(*ip))
            .copied()
            .collect(),
        ..ChangePlan::default()
    };

    for (ip, records) in by_ip {
        if !desired.contains(&ip) {
            plan.to_remove.extend(records.into_iter().cloned());
            continue;
        }

        let keep = records
            .iter()
            .position(|r| attributes_match(r, zone))
            .unwrap_or(0);
        for (i, record) in records.iter().enumerate() {
            if i == keep {
                if !attributes_match(record, zone) {
                    plan.to_update.push((*record).clone());
                }
            } else {
                plan.to_remove.push((*record).clone());
            }
        }
    }

    plan
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod plan_tests;
