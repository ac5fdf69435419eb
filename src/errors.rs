// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the reconciliation engine.
//!
//! Every failure surfaced by a collaborator client or by configuration loading is
//! expressed as a [`SyncError`]. The reconciler never lets one of these crash the
//! process mid-run; it converts them into log entries plus a skip decision:
//!
//! | Variant | Policy |
//! |---------|--------|
//! | `Transient` | log at WARN, skip the unit of work, retry next tick |
//! | `NotFound` | log at ERROR once, disable the zone until restart |
//! | `Configuration` | fatal at startup |
//! | `Authentication` | fatal during startup zone resolution, transient afterwards |

use thiserror::Error;

/// External collaborator an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// The node inventory (Remnawave panel)
    Inventory,
    /// The DNS provider (Cloudflare)
    DnsProvider,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Inventory => f.write_str("inventory"),
            Service::DnsProvider => f.write_str("dns-provider"),
        }
    }
}

/// Errors produced by the engine and its collaborator clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network failure, timeout, rate limit, 5xx or otherwise unusable response
    #[error("{service} request failed: {detail}")]
    Transient {
        /// Collaborator that failed
        service: Service,
        /// HTTP status, when one was received
        status: Option<u16>,
        /// Upstream detail or transport error text
        detail: String,
        /// Whether retrying the same call right away may succeed
        retryable: bool,
    },

    /// Zone lookup matched zero or several provider zones
    #[error("no unique provider zone for domain '{domain}' ({matches} matches)")]
    NotFound {
        /// Configured domain
        domain: String,
        /// How many zones the provider returned for it
        matches: usize,
    },

    /// Malformed or missing configuration
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Credential rejected by a collaborator (HTTP 401/403)
    #[error("{service} rejected credentials (HTTP {status}): {detail}")]
    Authentication {
        /// Collaborator that rejected the credential
        service: Service,
        /// HTTP status (401 or 403)
        status: u16,
        /// Upstream detail
        detail: String,
    },
}

impl SyncError {
    /// Build a retryable transport-level failure.
    #[must_use]
    pub fn transport(service: Service, detail: impl Into<String>) -> Self {
        SyncError::Transient {
            service,
            status: None,
            detail: detail.into(),
            retryable: true,
        }
    }

    /// Build a non-retryable failure for a response that could not be used.
    #[must_use]
    pub fn malformed(service: Service, detail: impl Into<String>) -> Self {
        SyncError::Transient {
            service,
            status: None,
            detail: detail.into(),
            retryable: false,
        }
    }

    /// Whether retrying the same call within the current tick may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient { retryable: true, .. })
    }

    /// Whether the error must stop the process when seen during startup.
    #[must_use]
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            SyncError::Configuration(_) | SyncError::Authentication { .. }
        )
    }

    /// Short label used for metrics and structured log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Transient { .. } => "transient",
            SyncError::NotFound { .. } => "not_found",
            SyncError::Configuration(_) => "configuration",
            SyncError::Authentication { .. } => "authentication",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
