// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Fleet node model as reported by the inventory service.

use serde::Deserialize;
use std::net::IpAddr;

/// A fleet member and its reported health attributes.
///
/// Deserialized straight from the inventory's camelCase JSON. The engine
/// trusts these fields verbatim and never probes nodes itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Opaque identifier
    #[serde(rename = "uuid")]
    pub id: String,

    /// Display name, when the inventory has one
    #[serde(default)]
    pub name: Option<String>,

    /// IPv4/IPv6 literal (hostnames never match a configured IP)
    pub address: String,

    #[serde(default)]
    pub is_connected: bool,

    #[serde(default)]
    pub is_disabled: bool,

    /// Presence means the proxy software is installed
    #[serde(default)]
    pub xray_version: Option<String>,
}

impl Node {
    /// `isConnected AND NOT isDisabled AND xrayVersion is present`.
    ///
    /// This is the only health signal the engine acts on.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.is_connected && !self.is_disabled && self.xray_version.is_some()
    }

    /// The node address as an IP, if it is an IP literal.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.address.trim().parse().ok()
    }

    /// Human-readable reasons this node fails the health predicate.
    ///
    /// Empty for a healthy node.
    #[must_use]
    pub fn unhealthy_reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if !self.is_connected {
            reasons.push("disconnected");
        }
        if self.is_disabled {
            reasons.push("disabled");
        }
        if self.xray_version.is_none() {
            reasons.push("no xray");
        }
        reasons
    }

    /// Name for log lines, falling back to the identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod node_tests;
