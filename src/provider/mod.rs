// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider abstraction.
//!
//! The engine talks to the DNS provider only through [`DnsProvider`], a narrow
//! capability set: list zones by domain, list address records by exact name,
//! and create, update or delete a single address record. [`cloudflare`] holds the
//! production implementation; tests substitute in-memory fakes.

pub mod cloudflare;

use crate::errors::SyncError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::net::IpAddr;

/// Provider-side zone, as returned by a zone lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderZone {
    pub id: String,
    pub name: String,
}

/// Address record type, derived from the IP family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
}

impl RecordType {
    /// `A` for IPv4, `AAAA` for IPv6.
    #[must_use]
    pub fn for_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::AAAA,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An address record currently published by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Provider record identifier, needed for update and delete
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    pub ip: IpAddr,
    pub ttl: u32,
    pub proxied: bool,
}

/// Attributes of an address record to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddressRecord {
    pub name: String,
    pub ip: IpAddr,
    pub ttl: u32,
    pub proxied: bool,
}

impl NewAddressRecord {
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        RecordType::for_ip(&self.ip)
    }
}

/// Capability set the engine needs from a DNS provider.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Zones whose name equals `domain`.
    async fn list_zones(&self, domain: &str) -> Result<Vec<ProviderZone>, SyncError>;

    /// A/AAAA records in `zone_id` whose name equals `record_name`, all pages.
    async fn list_address_records(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<Vec<AddressRecord>, SyncError>;

    async fn create_address_record(
        &self,
        zone_id: &str,
        record: &NewAddressRecord,
    ) -> Result<AddressRecord, SyncError>;

    /// Set TTL and proxied flag of an existing record, keeping name and content.
    async fn update_address_record(
        &self,
        zone_id: &str,
        record_id: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<AddressRecord, SyncError>;

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), SyncError>;
}
