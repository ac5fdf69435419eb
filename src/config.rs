// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration loading and validation.
//!
//! The configuration is a YAML document:
//!
//! ```yaml
//! remnawave:
//!   check-interval: 30
//! domains:
//!   - domain: example.com
//!     zones:
//!       - name: proxy
//!         ttl: 120
//!         proxied: false
//!         ips: ["203.0.113.10", "203.0.113.11"]
//! logging:
//!   level: INFO
//! ```
//!
//! Any `${NAME}` inside a string value is replaced with the environment variable
//! `NAME` before the document is interpreted. Credentials come from
//! `REMNAWAVE_API_URL`, `REMNAWAVE_API_KEY` and `CLOUDFLARE_API_TOKEN`, falling
//! back to the matching keys in the file.
//!
//! Loading produces an immutable [`AppConfig`]; every problem is reported as
//! [`SyncError::Configuration`] and stops the process before it starts.

use crate::constants::{
    APEX_LABEL, AUTOMATIC_TTL, CLOUDFLARE_API_BASE_URL, DEFAULT_CHECK_INTERVAL_SECS,
    DEFAULT_RECORD_TTL_SECS, ENV_CLOUDFLARE_API_TOKEN, ENV_REMNAWAVE_API_KEY,
    ENV_REMNAWAVE_API_URL, MAX_RECORD_TTL_SECS, MIN_RECORD_TTL_SECS,
};
use crate::errors::SyncError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// File Model
// ============================================================================

/// Top-level document as written by the operator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigFile {
    #[serde(default)]
    pub remnawave: RemnawaveSection,

    #[serde(default)]
    pub cloudflare: CloudflareSection,

    #[serde(default)]
    pub domains: Vec<DomainSection>,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

/// `remnawave:` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemnawaveSection {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Seconds between reconciliation ticks
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for RemnawaveSection {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            check_interval: default_check_interval(),
        }
    }
}

/// `cloudflare:` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CloudflareSection {
    #[serde(default)]
    pub api_token: Option<String>,

    /// Override of the API base URL
    #[serde(default)]
    pub api_url: Option<String>,
}

/// One entry of `domains:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DomainSection {
    pub domain: String,

    #[serde(default)]
    pub zones: Vec<ZoneSection>,
}

/// One entry of `domains[].zones:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ZoneSection {
    pub name: String,

    #[serde(default = "default_ttl")]
    pub ttl: u32,

    #[serde(default)]
    pub proxied: bool,

    #[serde(default)]
    pub ips: Vec<String>,
}

/// `logging:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: LogLevel,
}

/// `metrics:` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetricsSection {
    /// Address for the `/metrics` listener; disabled when absent
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

/// Operator-facing log level names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[serde(alias = "debug")]
    Debug,
    #[default]
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "WARN", alias = "warning", alias = "warn")]
    Warning,
    #[serde(alias = "error")]
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_ttl() -> u32 {
    DEFAULT_RECORD_TTL_SECS
}

// ============================================================================
// Validated Model
// ============================================================================

/// A configured zone: one record name, its attributes and candidate IPs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Provider-side domain, e.g. `example.com`
    pub domain: String,
    /// Record label under the domain, `@` for the apex
    pub name: String,
    pub ttl: u32,
    pub proxied: bool,
    /// Ordered, de-duplicated candidate IPs
    pub ips: Vec<IpAddr>,
}

impl ZoneConfig {
    /// Fully-qualified record name managed by this zone.
    #[must_use]
    pub fn record_name(&self) -> String {
        if self.name.is_empty() || self.name == APEX_LABEL {
            self.domain.clone()
        } else {
            format!("{}.{}", self.name, self.domain)
        }
    }
}

impl fmt::Display for ZoneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.record_name())
    }
}

/// Credentials and endpoint of the inventory service.
#[derive(Clone)]
pub struct RemnawaveSettings {
    pub base_url: Url,
    pub api_key: String,
}

impl fmt::Debug for RemnawaveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemnawaveSettings")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Credentials and endpoint of the DNS provider.
#[derive(Clone)]
pub struct CloudflareSettings {
    pub base_url: Url,
    pub api_token: String,
}

impl fmt::Debug for CloudflareSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareSettings")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Fully validated process configuration, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub check_interval: Duration,
    pub remnawave: RemnawaveSettings,
    pub cloudflare: CloudflareSettings,
    pub zones: Vec<ZoneConfig>,
    pub log_level: LogLevel,
    pub metrics_addr: Option<SocketAddr>,
}

impl AppConfig {
    /// Load and validate the configuration file, reading the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] when the file is missing, unreadable,
    /// malformed or fails validation.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text, |name| std::env::var(name).ok())
    }

    /// Parse and validate a YAML document using `env` to resolve variables.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] on any parse or validation failure.
    pub fn from_yaml<E>(text: &str, env: E) -> Result<Self, SyncError>
    where
        E: Fn(&str) -> Option<String>,
    {
        if text.trim().is_empty() {
            return Err(SyncError::Configuration("configuration is empty".into()));
        }
        let mut value: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| SyncError::Configuration(format!("malformed YAML: {e}")))?;
        if value.is_null() {
            return Err(SyncError::Configuration("configuration is empty".into()));
        }
        substitute_env_vars(&mut value, &env);

        let file: ConfigFile = serde_yaml::from_value(value)
            .map_err(|e| SyncError::Configuration(e.to_string()))?;
        Self::from_file(file, &env)
    }

    /// Validate a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] describing the first problem found.
    pub fn from_file<E>(file: ConfigFile, env: &E) -> Result<Self, SyncError>
    where
        E: Fn(&str) -> Option<String>,
    {
        if file.remnawave.check_interval == 0 {
            return Err(SyncError::Configuration(
                "remnawave.check-interval must be greater than zero".into(),
            ));
        }

        let remnawave_url = required(
            env(ENV_REMNAWAVE_API_URL).or(file.remnawave.url),
            ENV_REMNAWAVE_API_URL,
        )?;
        let remnawave = RemnawaveSettings {
            base_url: parse_base_url(&remnawave_url, ENV_REMNAWAVE_API_URL)?,
            api_key: required(
                env(ENV_REMNAWAVE_API_KEY).or(file.remnawave.api_key),
                ENV_REMNAWAVE_API_KEY,
            )?,
        };

        let cloudflare_url = file
            .cloudflare
            .api_url
            .unwrap_or_else(|| CLOUDFLARE_API_BASE_URL.to_string());
        let cloudflare = CloudflareSettings {
            base_url: parse_base_url(&cloudflare_url, "cloudflare.api-url")?,
            api_token: required(
                env(ENV_CLOUDFLARE_API_TOKEN).or(file.cloudflare.api_token),
                ENV_CLOUDFLARE_API_TOKEN,
            )?,
        };

        let zones = validate_zones(&file.domains)?;

        Ok(Self {
            check_interval: Duration::from_secs(file.remnawave.check_interval),
            remnawave,
            cloudflare,
            zones,
            log_level: file.logging.level,
            metrics_addr: file.metrics.listen_addr,
        })
    }
}

/// Distinct domains of `zones` in first-seen order.
#[must_use]
pub fn distinct_domains(zones: &[ZoneConfig]) -> Vec<String> {
    let mut seen = HashSet::new();
    zones
        .iter()
        .filter(|z| seen.insert(z.domain.as_str()))
        .map(|z| z.domain.clone())
        .collect()
}

fn required(value: Option<String>, name: &str) -> Result<String, SyncError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SyncError::Configuration(format!("{name} is not set"))),
    }
}

/// Parse a base URL, making sure relative joins keep its path.
fn parse_base_url(raw: &str, name: &str) -> Result<Url, SyncError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| SyncError::Configuration(format!("{name} is not a valid URL: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SyncError::Configuration(format!(
            "{name} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn validate_zones(domains: &[DomainSection]) -> Result<Vec<ZoneConfig>, SyncError> {
    let mut zones = Vec::new();
    let mut record_names = HashSet::new();

    for domain_section in domains {
        let domain = domain_section
            .domain
            .trim()
            .trim_end_matches('.')
            .to_ascii_lowercase();
        if domain.is_empty() {
            return Err(SyncError::Configuration(
                "domains[].domain must not be empty".into(),
            ));
        }

        for zone in &domain_section.zones {
            let name = zone.name.trim().to_ascii_lowercase();

            if zone.ttl != AUTOMATIC_TTL
                && !(MIN_RECORD_TTL_SECS..=MAX_RECORD_TTL_SECS).contains(&zone.ttl)
            {
                return Err(SyncError::Configuration(format!(
                    "ttl {} for zone '{name}' under {domain} must be {AUTOMATIC_TTL} (automatic) \
                     or between {MIN_RECORD_TTL_SECS} and {MAX_RECORD_TTL_SECS}",
                    zone.ttl
                )));
            }

            let mut ips: Vec<IpAddr> = Vec::with_capacity(zone.ips.len());
            for raw in &zone.ips {
                let ip: IpAddr = raw.trim().parse().map_err(|_| {
                    SyncError::Configuration(format!(
                        "'{raw}' in zone '{name}' under {domain} is not an IP address"
                    ))
                })?;
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }

            let config = ZoneConfig {
                domain: domain.clone(),
                name,
                ttl: zone.ttl,
                proxied: zone.proxied,
                ips,
            };

            if !record_names.insert(config.record_name()) {
                return Err(SyncError::Configuration(format!(
                    "record name {} is configured more than once",
                    config.record_name()
                )));
            }
            zones.push(config);
        }
    }

    if zones.is_empty() {
        return Err(SyncError::Configuration(
            "no zones configured under domains[].zones".into(),
        ));
    }

    Ok(zones)
}

/// Replace `${NAME}` in every string value; unset variables become empty.
fn substitute_env_vars<E>(value: &mut serde_yaml::Value, env: &E)
where
    E: Fn(&str) -> Option<String>,
{
    match value {
        serde_yaml::Value::String(s) => {
            if s.contains("${") {
                *s = expand(s, env);
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                substitute_env_vars(item, env);
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                substitute_env_vars(item, env);
            }
        }
        serde_yaml::Value::Tagged(tagged) => substitute_env_vars(&mut tagged.value, env),
        _ => {}
    }
}

fn expand<E>(input: &str, env: &E) -> String
where
    E: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                out.push_str(&env(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            _ => {
                // Not a well-formed reference, keep it literally.
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
