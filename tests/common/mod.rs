// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use remnadns::config::{CloudflareSettings, RemnawaveSettings};
use remnadns::inventory::RemnawaveClient;
use remnadns::provider::cloudflare::CloudflareClient;
use remnadns::retry::RetryPolicy;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;
use wiremock::MockServer;

pub const CLOUDFLARE_TOKEN: &str = "cf-test-token";
pub const REMNAWAVE_KEY: &str = "rw-test-key";

/// Path prefix the mock Cloudflare API is mounted under
pub const CF_PREFIX: &str = "/client/v4";

/// Retry policy with millisecond waits so retry tests stay fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
        max_elapsed_time: Duration::from_millis(500),
        ..RetryPolicy::default()
    }
}

pub fn cloudflare_settings(server: &MockServer) -> CloudflareSettings {
    CloudflareSettings {
        base_url: Url::parse(&format!("{}{CF_PREFIX}/", server.uri())).unwrap(),
        api_token: CLOUDFLARE_TOKEN.to_string(),
    }
}

/// Cloudflare client against `server` that fails on the first error
pub fn cloudflare_client(server: &MockServer) -> CloudflareClient {
    CloudflareClient::new(&cloudflare_settings(server))
        .unwrap()
        .with_retry_policy(RetryPolicy::no_retry())
}

pub fn remnawave_settings(server: &MockServer) -> RemnawaveSettings {
    RemnawaveSettings {
        base_url: Url::parse(&format!("{}/", server.uri())).unwrap(),
        api_key: REMNAWAVE_KEY.to_string(),
    }
}

/// Remnawave client against `server` that fails on the first error
pub fn remnawave_client(server: &MockServer) -> RemnawaveClient {
    RemnawaveClient::new(&remnawave_settings(server))
        .unwrap()
        .with_retry_policy(RetryPolicy::no_retry())
}

/// Successful Cloudflare envelope around `result`
pub fn envelope(result: Value) -> Value {
    json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
    })
}

/// Successful Cloudflare list envelope for one page
pub fn page(result: Value, page: u32, total_pages: u32) -> Value {
    let count = result.as_array().map_or(0, Vec::len);
    json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
        "result_info": {
            "page": page,
            "per_page": 100,
            "count": count,
            "total_pages": total_pages,
        },
    })
}

/// Failed Cloudflare envelope with one error
pub fn error_envelope(code: i64, message: &str) -> Value {
    json!({
        "success": false,
        "errors": [{ "code": code, "message": message }],
        "messages": [],
        "result": null,
    })
}

pub fn zone_json(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name, "status": "active" })
}

pub fn record_json(id: &str, name: &str, ip: &str, ttl: u32, proxied: bool) -> Value {
    let record_type = if ip.contains(':') { "AAAA" } else { "A" };
    json!({
        "id": id,
        "name": name,
        "type": record_type,
        "content": ip,
        "ttl": ttl,
        "proxied": proxied,
    })
}

/// One inventory node as the Remnawave panel reports it
pub fn node_json(uuid: &str, address: &str, connected: bool, disabled: bool, xray: Option<&str>) -> Value {
    json!({
        "uuid": uuid,
        "name": format!("node-{uuid}"),
        "address": address,
        "port": 2222,
        "isConnected": connected,
        "isDisabled": disabled,
        "isNodeOnline": connected,
        "xrayVersion": xray,
        "countryCode": "NL",
    })
}

pub fn nodes_body(nodes: Vec<Value>) -> Value {
    json!({ "response": nodes })
}
