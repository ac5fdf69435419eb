// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired state: which configured IPs should be published right now.
//!
//! Everything here is pure. A [`HealthIndex`] is built once per tick from the
//! health snapshot and shared by every zone, so all zones of a tick see the
//! same view of the fleet.

use crate::config::ZoneConfig;
use crate::node::Node;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::net::IpAddr;

/// IP-level view of one health snapshot.
///
/// An IP is healthy when at least one node reporting it is healthy. Nodes
/// whose address is not an IP literal never match a configured IP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthIndex {
    healthy: HashSet<IpAddr>,
    reported: HashSet<IpAddr>,
}

impl HealthIndex {
    #[must_use]
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut index = Self::default();
        for node in nodes {
            let Some(ip) = node.ip() else { continue };
            index.reported.insert(ip);
            if node.is_healthy() {
                index.healthy.insert(ip);
            }
        }
        index
    }

    #[must_use]
    pub fn is_healthy(&self, ip: &IpAddr) -> bool {
        self.healthy.contains(ip)
    }

    /// Whether any node in the snapshot reports `ip`.
    #[must_use]
    pub fn is_reported(&self, ip: &IpAddr) -> bool {
        self.reported.contains(ip)
    }
}

/// Configured IPs of `zone` that are currently healthy.
///
/// IPs without any matching node are excluded.
#[must_use]
pub fn compute_desired(zone: &ZoneConfig, health: &HealthIndex) -> BTreeSet<IpAddr> {
    zone.ips
        .iter()
        .filter(|ip| health.is_healthy(ip))
        .copied()
        .collect()
}

/// Online summary of one zone, e.g. `2/3 online`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    pub online: usize,
    pub configured: usize,
    /// Configured IPs that are not desired, in configuration order
    pub offline: Vec<IpAddr>,
}

impl ZoneStatus {
    #[must_use]
    pub fn new(zone: &ZoneConfig, desired: &BTreeSet<IpAddr>) -> Self {
        Self {
            online: desired.len(),
            configured: zone.ips.len(),
            offline: zone
                .ips
                .iter()
                .filter(|ip| !desired.contains(*ip))
                .copied()
                .collect(),
        }
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} online", self.online, self.configured)
    }
}

#[cfg(test)]
#[path = "desired_tests.rs"]
mod desired_tests;
