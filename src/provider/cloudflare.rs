// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 API implementation of [`DnsProvider`].
//!
//! Every call goes through [`CloudflareClient::request`], which wraps a single
//! HTTP exchange with bounded exponential backoff. List calls aggregate all
//! pages before returning so the engine never diffs against a partial listing.

use super::{AddressRecord, DnsProvider, NewAddressRecord, ProviderZone, RecordType};
use crate::config::CloudflareSettings;
use crate::constants::{RECORD_LIST_PAGE_SIZE, ZONE_LIST_PAGE_SIZE};
use crate::errors::{Service, SyncError};
use crate::http_client::build_http_client;
use crate::http_errors::{map_http_status, map_transport_error};
use crate::pagination::{list_all_pages, Page};
use crate::retry::{retry_http_call, RetryPolicy};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;
use tracing::{debug, warn};
use url::Url;

/// Cloudflare error codes that mean the token itself was rejected.
const AUTH_ERROR_CODES: &[i64] = &[6003, 6111, 9109, 10000];

/// Standard Cloudflare response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct RecordDto {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    proxied: bool,
}

impl RecordDto {
    /// Convert to an address record; `None` for other record types.
    fn into_address_record(self) -> Option<AddressRecord> {
        if self.record_type != RecordType::A.as_str()
            && self.record_type != RecordType::AAAA.as_str()
        {
            return None;
        }
        match self.content.parse::<IpAddr>() {
            Ok(ip) => Some(AddressRecord {
                id: self.id,
                name: self.name,
                ip,
                ttl: self.ttl,
                proxied: self.proxied,
            }),
            Err(_) => {
                warn!(
                    record_id = %self.id,
                    record = %self.name,
                    content = %self.content,
                    "Ignoring address record with unparseable content"
                );
                None
            }
        }
    }
}

fn join_messages(messages: &[ApiMessage]) -> String {
    if messages.is_empty() {
        return "no error detail".to_string();
    }
    messages
        .iter()
        .map(|m| format!("{} ({})", m.message, m.code))
        .collect::<Vec<_>>()
        .join("; ")
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// HTTP client for the Cloudflare API.
#[derive(Debug, Clone)]
pub struct CloudflareClient {
    http: HttpClient,
    base_url: Url,
    api_token: String,
    retry: RetryPolicy,
}

impl CloudflareClient {
    /// Create a client for the configured endpoint and token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &CloudflareSettings) -> Result<Self, SyncError> {
        Ok(Self {
            http: build_http_client()?,
            base_url: settings.base_url.clone(),
            api_token: settings.api_token.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the per-call retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build an endpoint URL from path segments and query pairs.
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                SyncError::Configuration(format!(
                    "Cloudflare base URL {} cannot carry a path",
                    self.base_url
                ))
            })?;
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Execute a request with automatic retry.
    ///
    /// # Retry Behavior
    /// - Retries on transport failures, HTTP 408, 429 and 5xx
    /// - Fails immediately on authentication and other client errors
    /// - Total retry time bounded by the client's [`RetryPolicy`]
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
        operation: &str,
    ) -> Result<ApiResponse<T>, SyncError> {
        retry_http_call(&self.retry, operation, || {
            self.request_once(method.clone(), url.clone(), body.as_ref())
        })
        .await
    }

    /// Single HTTP exchange without retry.
    async fn request_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse<T>, SyncError> {
        debug!(
            method = %method,
            url = %url,
            body = ?body,
            "HTTP API request to Cloudflare"
        );

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&self.api_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(Service::DnsProvider, &e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(Service::DnsProvider, &e))?;

        if !status.is_success() {
            let envelope = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text).ok();
            let detail = envelope
                .as_ref()
                .map_or_else(|| text.clone(), |e| join_messages(&e.errors));
            let token_rejected = envelope
                .as_ref()
                .is_some_and(|e| e.errors.iter().any(|m| AUTH_ERROR_CODES.contains(&m.code)));

            debug!(
                method = %method,
                url = %url,
                status = %status,
                error = %detail,
                "HTTP API request failed"
            );

            if token_rejected {
                return Err(SyncError::Authentication {
                    service: Service::DnsProvider,
                    status: status.as_u16(),
                    detail,
                });
            }
            return Err(map_http_status(Service::DnsProvider, status.as_u16(), &detail));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            SyncError::malformed(
                Service::DnsProvider,
                format!("failed to decode response from {url}: {e}"),
            )
        })?;

        if !envelope.success {
            return Err(SyncError::malformed(
                Service::DnsProvider,
                format!("Cloudflare reported failure: {}", join_messages(&envelope.errors)),
            ));
        }

        Ok(envelope)
    }

    async fn zones_page(&self, domain: &str, page: u32) -> Result<Page<ProviderZone>, SyncError> {
        let url = self.endpoint(
            &["zones"],
            &[
                ("name", domain.to_string()),
                ("page", page.to_string()),
                ("per_page", ZONE_LIST_PAGE_SIZE.to_string()),
            ],
        )?;
        let response: ApiResponse<Vec<ProviderZone>> =
            self.request(Method::GET, url, None, "list zones").await?;
        Ok(into_page(response, page))
    }

    async fn records_page(
        &self,
        zone_id: &str,
        record_name: &str,
        page: u32,
    ) -> Result<Page<RecordDto>, SyncError> {
        let url = self.endpoint(
            &["zones", zone_id, "dns_records"],
            &[
                ("name", record_name.to_string()),
                ("page", page.to_string()),
                ("per_page", RECORD_LIST_PAGE_SIZE.to_string()),
            ],
        )?;
        let response: ApiResponse<Vec<RecordDto>> =
            self.request(Method::GET, url, None, "list dns records").await?;
        Ok(into_page(response, page))
    }
}

fn into_page<T>(response: ApiResponse<Vec<T>>, requested: u32) -> Page<T> {
    let (page, total_pages) = response
        .result_info
        .map_or((requested, requested), |info| {
            (info.page.max(requested), info.total_pages)
        });
    Page {
        items: response.result.unwrap_or_default(),
        page,
        total_pages,
    }
}

fn required_result<T>(response: ApiResponse<T>, operation: &str) -> Result<T, SyncError> {
    response.result.ok_or_else(|| {
        SyncError::malformed(
            Service::DnsProvider,
            format!("Cloudflare returned no result for {operation}"),
        )
    })
}

fn address_record_result(
    response: ApiResponse<RecordDto>,
    operation: &str,
) -> Result<AddressRecord, SyncError> {
    required_result(response, operation)?
        .into_address_record()
        .ok_or_else(|| {
            SyncError::malformed(
                Service::DnsProvider,
                format!("Cloudflare returned a non-address record for {operation}"),
            )
        })
}

#[async_trait]
impl DnsProvider for CloudflareClient {
    async fn list_zones(&self, domain: &str) -> Result<Vec<ProviderZone>, SyncError> {
        let zones = list_all_pages(Service::DnsProvider, |page| self.zones_page(domain, page))
            .await?;

        // The name filter is exact on Cloudflare's side; enforce it here too.
        let matching: Vec<ProviderZone> = zones
            .into_iter()
            .filter(|z| names_match(&z.name, domain))
            .collect();

        debug!(domain = %domain, matches = matching.len(), "Listed provider zones");
        Ok(matching)
    }

    async fn list_address_records(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<Vec<AddressRecord>, SyncError> {
        let records = list_all_pages(Service::DnsProvider, |page| {
            self.records_page(zone_id, record_name, page)
        })
        .await?;

        let address_records: Vec<AddressRecord> = records
            .into_iter()
            .filter(|r| names_match(&r.name, record_name))
            .filter_map(RecordDto::into_address_record)
            .collect();

        debug!(
            zone_id = %zone_id,
            record = %record_name,
            count = address_records.len(),
            "Listed address records"
        );
        Ok(address_records)
    }

    async fn create_address_record(
        &self,
        zone_id: &str,
        record: &NewAddressRecord,
    ) -> Result<AddressRecord, SyncError> {
        let url = self.endpoint(&["zones", zone_id, "dns_records"], &[])?;
        let body = json!({
            "type": record.record_type().as_str(),
            "name": record.name,
            "content": record.ip.to_string(),
            "ttl": record.ttl,
            "proxied": record.proxied,
        });

        let response: ApiResponse<RecordDto> = self
            .request(Method::POST, url, Some(body), "create dns record")
            .await?;
        let created = address_record_result(response, "create dns record")?;

        debug!(
            zone_id = %zone_id,
            record = %created.name,
            ip = %created.ip,
            record_id = %created.id,
            "Created DNS record"
        );
        Ok(created)
    }

    async fn update_address_record(
        &self,
        zone_id: &str,
        record_id: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<AddressRecord, SyncError> {
        let url = self.endpoint(&["zones", zone_id, "dns_records", record_id], &[])?;
        let body = json!({ "ttl": ttl, "proxied": proxied });

        let response: ApiResponse<RecordDto> = self
            .request(Method::PATCH, url, Some(body), "update dns record")
            .await?;
        let updated = address_record_result(response, "update dns record")?;

        debug!(
            zone_id = %zone_id,
            record = %updated.name,
            ip = %updated.ip,
            record_id = %updated.id,
            ttl = updated.ttl,
            proxied = updated.proxied,
            "Updated DNS record"
        );
        Ok(updated)
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), SyncError> {
        let url = self.endpoint(&["zones", zone_id, "dns_records", record_id], &[])?;
        let _: ApiResponse<serde_json::Value> = self
            .request(Method::DELETE, url, None, "delete dns record")
            .await?;

        debug!(zone_id = %zone_id, record_id = %record_id, "Deleted DNS record");
        Ok(())
    }
}
