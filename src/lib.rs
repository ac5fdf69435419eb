// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # remnadns - DNS address records that follow proxy node health
//!
//! remnadns keeps the A/AAAA records of a set of Cloudflare record names in
//! sync with the health of Remnawave proxy nodes. A node is healthy when it is
//! connected, not disabled and has xray installed; only configured IPs of
//! healthy nodes are published.
//!
//! ## Overview
//!
//! Each reconciliation tick:
//!
//! - Fetches one health snapshot from the inventory ([`inventory`])
//! - Computes the desired IPs per configured zone ([`reconcilers::desired`])
//! - Lists the published records ([`reconcilers::actual`])
//! - Creates, updates and deletes records to close the gap ([`reconcilers`])
//!
//! A failed health fetch skips the whole tick. A failure in one zone never
//! stops another.
//!
//! ## Modules
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`inventory`] - Health source trait and Remnawave client
//! - [`provider`] - DNS provider trait and Cloudflare client
//! - [`zones`] - Zone discovery and the zone id cache
//! - [`reconcilers`] - Desired/actual state, diff and the tick itself
//! - [`scheduler`] - Timer-driven loop with graceful shutdown
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use remnadns::config::AppConfig;
//! use std::path::Path;
//!
//! let config = AppConfig::load(Path::new("config.yml")).unwrap();
//! for zone in &config.zones {
//!     println!("{zone}: {} candidate IPs", zone.ips.len());
//! }
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod http_client;
pub mod http_errors;
pub mod inventory;
pub mod metrics;
pub mod metrics_server;
pub mod node;
pub mod pagination;
pub mod provider;
pub mod reconcilers;
pub mod retry;
pub mod scheduler;
pub mod zones;

#[cfg(test)]
mod test_support;
