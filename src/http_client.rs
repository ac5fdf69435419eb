// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared construction of the outbound HTTP client.

use crate::constants::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::errors::SyncError;
use reqwest::Client as HttpClient;
use std::time::Duration;

/// Build an HTTP client with bounded connect and request timeouts.
///
/// # Errors
///
/// Returns [`SyncError::Configuration`] if the TLS backend cannot be initialized.
pub fn build_http_client() -> Result<HttpClient, SyncError> {
    HttpClient::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| SyncError::Configuration(format!("failed to build HTTP client: {e}")))
}
