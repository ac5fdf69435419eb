// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory collaborators for unit tests.
//!
//! The fakes record every call so tests can assert which provider operations a
//! tick attempted, and can be told to fail specific operations.

use crate::config::ZoneConfig;
use crate::errors::SyncError;
use crate::inventory::HealthSource;
use crate::node::Node;
use crate::provider::{AddressRecord, DnsProvider, NewAddressRecord, ProviderZone};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Mutex;

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListZones(String),
    ListRecords { zone_id: String, name: String },
    Create { zone_id: String, name: String, ip: IpAddr },
    Update { zone_id: String, record_id: String },
    Delete { zone_id: String, record_id: String },
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::Create { .. } | Call::Update { .. } | Call::Delete { .. }
        )
    }
}

#[derive(Default)]
struct ProviderState {
    zones: HashMap<String, Vec<ProviderZone>>,
    records: HashMap<String, Vec<AddressRecord>>,
    zone_failures: HashMap<String, SyncError>,
    list_failures: HashMap<String, SyncError>,
    create_failures: HashMap<IpAddr, SyncError>,
    calls: Vec<Call>,
    next_id: u64,
}

/// Fake DNS provider holding zones and records in memory.
#[derive(Default)]
pub struct FakeDnsProvider {
    state: Mutex<ProviderState>,
}

impl FakeDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(self, domain: &str, zone_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .zones
            .entry(domain.to_string())
            .or_default()
            .push(ProviderZone {
                id: zone_id.to_string(),
                name: domain.to_string(),
            });
        self
    }

    pub fn add_record(&self, zone_id: &str, name: &str, ip: &str, ttl: u32, proxied: bool) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("rec-{}", state.next_id);
        state
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(AddressRecord {
                id: id.clone(),
                name: name.to_string(),
                ip: ip.parse().unwrap(),
                ttl,
                proxied,
            });
        id
    }

    pub fn fail_zone_lookup(&self, domain: &str, err: SyncError) {
        self.state
            .lock()
            .unwrap()
            .zone_failures
            .insert(domain.to_string(), err);
    }

    pub fn clear_zone_failure(&self, domain: &str) {
        self.state.lock().unwrap().zone_failures.remove(domain);
    }

    pub fn fail_listing(&self, zone_id: &str, err: SyncError) {
        self.state
            .lock()
            .unwrap()
            .list_failures
            .insert(zone_id.to_string(), err);
    }

    pub fn clear_listing_failure(&self, zone_id: &str) {
        self.state.lock().unwrap().list_failures.remove(zone_id);
    }

    pub fn fail_create(&self, ip: &str, err: SyncError) {
        self.state
            .lock()
            .unwrap()
            .create_failures
            .insert(ip.parse().unwrap(), err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn records(&self, zone_id: &str, name: &str) -> Vec<AddressRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(zone_id)
            .map(|records| records.iter().filter(|r| r.name == name).cloned().collect())
            .unwrap_or_default()
    }

    pub fn ips(&self, zone_id: &str, name: &str) -> BTreeSet<IpAddr> {
        self.records(zone_id, name).into_iter().map(|r| r.ip).collect()
    }
}

#[async_trait]
impl DnsProvider for FakeDnsProvider {
    async fn list_zones(&self, domain: &str) -> Result<Vec<ProviderZone>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListZones(domain.to_string()));
        if let Some(err) = state.zone_failures.get(domain) {
            return Err(err.clone());
        }
        Ok(state.zones.get(domain).cloned().unwrap_or_default())
    }

    async fn list_address_records(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<Vec<AddressRecord>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListRecords {
            zone_id: zone_id.to_string(),
            name: record_name.to_string(),
        });
        if let Some(err) = state.list_failures.get(zone_id) {
            return Err(err.clone());
        }
        Ok(state
            .records
            .get(zone_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.name == record_name)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_address_record(
        &self,
        zone_id: &str,
        record: &NewAddressRecord,
    ) -> Result<AddressRecord, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            zone_id: zone_id.to_string(),
            name: record.name.clone(),
            ip: record.ip,
        });
        if let Some(err) = state.create_failures.get(&record.ip) {
            return Err(err.clone());
        }
        state.next_id += 1;
        let created = AddressRecord {
            id: format!("rec-{}", state.next_id),
            name: record.name.clone(),
            ip: record.ip,
            ttl: record.ttl,
            proxied: record.proxied,
        };
        state
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_address_record(
        &self,
        zone_id: &str,
        record_id: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<AddressRecord, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
        });
        let record = state
            .records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| SyncError::malformed(crate::errors::Service::DnsProvider, "no such record"))?;
        record.ttl = ttl;
        record.proxied = proxied;
        Ok(record.clone())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
        });
        if let Some(records) = state.records.get_mut(zone_id) {
            records.retain(|r| r.id != record_id);
        }
        Ok(())
    }
}

/// Fake inventory returning a preset snapshot or error.
pub struct FakeHealthSource {
    snapshot: Mutex<Result<Vec<Node>, SyncError>>,
    calls: Mutex<usize>,
}

impl FakeHealthSource {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            snapshot: Mutex::new(Ok(nodes)),
            calls: Mutex::new(0),
        }
    }

    pub fn set_nodes(&self, nodes: Vec<Node>) {
        *self.snapshot.lock().unwrap() = Ok(nodes);
    }

    pub fn fail_with(&self, err: SyncError) {
        *self.snapshot.lock().unwrap() = Err(err);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl HealthSource for FakeHealthSource {
    async fn fetch_nodes(&self) -> Result<Vec<Node>, SyncError> {
        *self.calls.lock().unwrap() += 1;
        self.snapshot.lock().unwrap().clone()
    }
}

pub fn node(address: &str, connected: bool, disabled: bool, xray: Option<&str>) -> Node {
    Node {
        id: format!("node-{address}"),
        name: None,
        address: address.to_string(),
        is_connected: connected,
        is_disabled: disabled,
        xray_version: xray.map(str::to_string),
    }
}

pub fn healthy(address: &str) -> Node {
    node(address, true, false, Some("1.8.4"))
}

pub fn zone_config(domain: &str, name: &str, ips: &[&str]) -> ZoneConfig {
    ZoneConfig {
        domain: domain.to_string(),
        name: name.to_string(),
        ttl: 120,
        proxied: false,
        ips: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
