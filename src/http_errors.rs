// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP status mapping to [`SyncError`].
//!
//! Both collaborator clients funnel every non-success response and every
//! transport failure through this module so the retry layer and the reconciler
//! see one consistent classification.
//!
//! # Usage
//!
//! ```rust
//! use remnadns::errors::{Service, SyncError};
//! use remnadns::http_errors::map_http_status;
//!
//! let err = map_http_status(Service::DnsProvider, 503, "upstream down");
//! assert!(err.is_retryable());
//!
//! let err = map_http_status(Service::Inventory, 401, "bad key");
//! assert!(matches!(err, SyncError::Authentication { status: 401, .. }));
//! ```

use crate::errors::{Service, SyncError};

/// Map HTTP status code to a [`SyncError`].
///
/// # HTTP Code Mapping
///
/// | HTTP Code | Error | Retried within the call |
/// |-----------|-------|-------------------------|
/// | 401, 403 | `Authentication` | no |
/// | 408 | `Transient` | yes |
/// | 429 | `Transient` | yes |
/// | 5xx | `Transient` | yes |
/// | Other | `Transient` | no |
#[must_use]
pub fn map_http_status(service: Service, status_code: u16, detail: &str) -> SyncError {
    match status_code {
        401 | 403 => SyncError::Authentication {
            service,
            status: status_code,
            detail: detail.to_string(),
        },
        408 | 429 | 500..=599 => SyncError::Transient {
            service,
            status: Some(status_code),
            detail: format!("HTTP {status_code}: {detail}"),
            retryable: true,
        },
        _ => SyncError::Transient {
            service,
            status: Some(status_code),
            detail: format!("unexpected HTTP {status_code}: {detail}"),
            retryable: false,
        },
    }
}

/// Map a `reqwest` transport error (no usable HTTP status) to a [`SyncError`].
///
/// Timeouts, refused connections and broken bodies are all retryable.
/// Decoding failures are not: the same response would fail again.
#[must_use]
pub fn map_transport_error(service: Service, err: &reqwest::Error) -> SyncError {
    if err.is_decode() {
        return SyncError::malformed(service, format!("failed to decode response: {err}"));
    }

    if let Some(status) = err.status() {
        return map_http_status(service, status.as_u16(), &err.to_string());
    }

    let detail = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    };
    SyncError::transport(service, detail)
}

#[cfg(test)]
#[path = "http_errors_tests.rs"]
mod http_errors_tests;
