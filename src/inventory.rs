// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health snapshots from the node inventory.
//!
//! [`HealthSource`] is the engine's only view of fleet health. The production
//! implementation, [`RemnawaveClient`], reads the full node list from the
//! Remnawave panel in one request and either returns the complete snapshot or
//! fails; it never returns a partial one and never caches.

use crate::config::RemnawaveSettings;
use crate::constants::REMNAWAVE_NODES_PATH;
use crate::errors::{Service, SyncError};
use crate::http_client::build_http_client;
use crate::http_errors::{map_http_status, map_transport_error};
use crate::node::Node;
use crate::retry::{retry_http_call, RetryPolicy};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Source of the current fleet health snapshot.
#[async_trait]
pub trait HealthSource: Send + Sync {
    /// Fetch every node with its health attributes.
    async fn fetch_nodes(&self) -> Result<Vec<Node>, SyncError>;
}

/// Body of `GET /api/nodes`.
#[derive(Debug, Deserialize)]
struct NodesResponse {
    response: Vec<Node>,
}

/// HTTP client for the Remnawave panel API.
#[derive(Debug, Clone)]
pub struct RemnawaveClient {
    http: HttpClient,
    nodes_url: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl RemnawaveClient {
    /// Create a client for the configured panel.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the nodes URL
    /// cannot be derived from the base URL.
    pub fn new(settings: &RemnawaveSettings) -> Result<Self, SyncError> {
        let nodes_url = settings.base_url.join(REMNAWAVE_NODES_PATH).map_err(|e| {
            SyncError::Configuration(format!(
                "cannot derive nodes endpoint from {}: {e}",
                settings.base_url
            ))
        })?;

        Ok(Self {
            http: build_http_client()?,
            nodes_url,
            api_key: settings.api_key.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the per-call retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_nodes_once(&self) -> Result<Vec<Node>, SyncError> {
        debug!(url = %self.nodes_url, "HTTP API request to Remnawave");

        let response = self
            .http
            .get(self.nodes_url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| map_transport_error(Service::Inventory, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(Service::Inventory, &e))?;

        if !status.is_success() {
            debug!(url = %self.nodes_url, status = %status, error = %text, "HTTP API request failed");
            return Err(map_http_status(Service::Inventory, status.as_u16(), &text));
        }

        let body: NodesResponse = serde_json::from_str(&text).map_err(|e| {
            SyncError::malformed(Service::Inventory, format!("failed to decode node list: {e}"))
        })?;
        Ok(body.response)
    }
}

#[async_trait]
impl HealthSource for RemnawaveClient {
    async fn fetch_nodes(&self) -> Result<Vec<Node>, SyncError> {
        let nodes = retry_http_call(&self.retry, "list nodes", || self.fetch_nodes_once()).await?;

        for node in &nodes {
            debug!(
                node = %node.display_name(),
                address = %node.address,
                healthy = node.is_healthy(),
                "Node status"
            );
        }
        Ok(nodes)
    }
}
