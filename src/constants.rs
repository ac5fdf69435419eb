// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for remnadns.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Default path of the YAML configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Default interval between reconciliation ticks (30 seconds)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;

/// Default TTL for managed address records (2 minutes)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 120;

/// TTL value the provider interprets as "automatic"
pub const AUTOMATIC_TTL: u32 = 1;

/// Smallest explicit TTL the provider accepts
pub const MIN_RECORD_TTL_SECS: u32 = 60;

/// Largest explicit TTL the provider accepts (1 day)
pub const MAX_RECORD_TTL_SECS: u32 = 86_400;

/// Record label that addresses the domain apex
pub const APEX_LABEL: &str = "@";

// ============================================================================
// Environment Variables
// ============================================================================

/// Overrides the configuration file path
pub const ENV_CONFIG_PATH: &str = "REMNADNS_CONFIG";

/// Base URL of the Remnawave panel
pub const ENV_REMNAWAVE_API_URL: &str = "REMNAWAVE_API_URL";

/// Bearer credential for the Remnawave panel
pub const ENV_REMNAWAVE_API_KEY: &str = "REMNAWAVE_API_KEY";

/// Bearer credential for the Cloudflare API
pub const ENV_CLOUDFLARE_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";

/// Selects the log output format (`json` or `text`)
pub const ENV_LOG_FORMAT: &str = "RUST_LOG_FORMAT";

// ============================================================================
// External API Constants
// ============================================================================

/// Base URL of the Cloudflare v4 API
pub const CLOUDFLARE_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Remnawave endpoint listing every node
pub const REMNAWAVE_NODES_PATH: &str = "api/nodes";

/// Page size for Cloudflare zone listings
pub const ZONE_LIST_PAGE_SIZE: u32 = 50;

/// Page size for Cloudflare DNS record listings
pub const RECORD_LIST_PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched by a single list call
pub const MAX_LIST_PAGES: u32 = 1_000;

/// Timeout applied to every outbound HTTP request (10 seconds)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Connect timeout for outbound HTTP requests (5 seconds)
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;

/// User agent sent to both collaborators
pub const USER_AGENT: &str = concat!("remnadns/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Retry Constants
// ============================================================================

/// Initial retry interval (200ms)
pub const RETRY_INITIAL_INTERVAL_MILLIS: u64 = 200;

/// Maximum interval between retries (5 seconds)
pub const RETRY_MAX_INTERVAL_SECS: u64 = 5;

/// Maximum total time spent retrying one call (20 seconds)
pub const RETRY_MAX_ELAPSED_TIME_SECS: u64 = 20;

/// Backoff multiplier (exponential growth factor)
pub const RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
pub const RETRY_RANDOMIZATION_FACTOR: f64 = 0.1;

// ============================================================================
// Metrics Constants
// ============================================================================

/// Namespace prefix for all exported metrics
pub const METRICS_NAMESPACE: &str = "remnadns";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint served next to the metrics
pub const HEALTH_SERVER_PATH: &str = "/healthz";
