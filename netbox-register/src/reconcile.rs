//! Reconciliation between local system facts and the inventory record
//!
//! The engine is a plain field-by-field diff: it never fails on missing
//! remote data, an absent value simply yields a non-matching row.

use crate::discovery::{NetworkInterface, SystemFacts};
use crate::error::RegisterError;
use crate::inventory::{InventoryApi, IpAddressRecord, VirtualMachine, VmInterface};
use tracing::debug;

/// A remote interface with the address assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceRecord {
    pub interface: VmInterface,
    pub ip: Option<IpAddressRecord>,
    /// The IP is the VM's primary IPv4
    pub primary: bool,
}

/// Everything the inventory stores for one host
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub vm: VirtualMachine,
    pub interfaces: Vec<InterfaceRecord>,
}

impl InventoryRecord {
    /// Read the record of `hostname`, failing with `NotFound` when absent
    pub fn fetch(client: &dyn InventoryApi, hostname: &str) -> Result<Self, RegisterError> {
        let vm = client
            .find_vm_by_name(hostname)?
            .ok_or_else(|| RegisterError::NotFound(hostname.to_string()))?;
        Self::fetch_for_vm(client, vm)
    }

    /// Complete an already looked-up VM with its interfaces and addresses
    pub fn fetch_for_vm(
        client: &dyn InventoryApi,
        vm: VirtualMachine,
    ) -> Result<Self, RegisterError> {
        let primary_id = vm.primary_ip4.as_ref().map(|ip| ip.id);
        let mut interfaces = Vec::new();

        for interface in client.list_interfaces(vm.id)? {
            let ip = client.find_ip_by_interface(interface.id)?;
            let primary = matches!((&ip, primary_id), (Some(ip), Some(id)) if ip.id == id);
            debug!(
                "Remote interface {} (ip: {:?})",
                interface.name,
                ip.as_ref().map(|i| &i.address)
            );
            interfaces.push(InterfaceRecord {
                interface,
                ip,
                primary,
            });
        }

        Ok(Self { vm, interfaces })
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceRecord> {
        self.interfaces.iter().find(|i| i.interface.name == name)
    }
}

/// One compared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRow {
    pub parameter: String,
    pub local: String,
    pub remote: String,
    pub matches: bool,
}

impl DiffRow {
    pub fn new(
        parameter: impl Into<String>,
        local: impl Into<String>,
        remote: impl Into<String>,
        matches: bool,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            local: local.into(),
            remote: remote.into(),
            matches,
        }
    }

    fn of_strings(parameter: String, local: String, remote: Option<String>) -> Self {
        let matches = remote.as_deref() == Some(local.as_str());
        Self::new(parameter, local, remote.unwrap_or_default(), matches)
    }
}

/// Outcome of comparing this host with its inventory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub hostname: String,
    pub rows: Vec<DiffRow>,
}

impl Comparison {
    pub fn all_match(&self) -> bool {
        self.rows.iter().all(|row| row.matches)
    }

    pub fn differences(&self) -> impl Iterator<Item = &DiffRow> {
        self.rows.iter().filter(|row| !row.matches)
    }
}

/// Compare facts with the record: vCPUs, disk, memory, then IP/DNS/MAC per eligible interface
pub fn compare(facts: &SystemFacts, record: &InventoryRecord) -> Vec<DiffRow> {
    let vm = &record.vm;
    let mut rows = vec![
        DiffRow::new(
            "vCPUs",
            facts.vcpus.to_string(),
            vm.vcpus.map(format_vcpus).unwrap_or_default(),
            vm.vcpus == Some(f64::from(facts.vcpus)),
        ),
        DiffRow::new(
            "Disk",
            facts.disk_gb.to_string(),
            vm.disk.map(|d| d.to_string()).unwrap_or_default(),
            vm.disk == Some(facts.disk_gb),
        ),
        DiffRow::new(
            "Memory",
            facts.memory_mb.to_string(),
            vm.memory.map(|m| m.to_string()).unwrap_or_default(),
            vm.memory == Some(facts.memory_mb),
        ),
    ];

    for local in facts.eligible_interfaces() {
        rows.extend(compare_interface(local, record.interface(&local.name)));
    }

    rows
}

fn compare_interface(local: &NetworkInterface, remote: Option<&InterfaceRecord>) -> [DiffRow; 3] {
    let name = &local.name;
    let remote_ip = remote.and_then(|r| r.ip.as_ref());

    [
        DiffRow::of_strings(
            format!("IP ({name})"),
            local.ip.map(|ip| ip.to_string()).unwrap_or_default(),
            remote_ip.map(|ip| ip.host().to_string()),
        ),
        DiffRow::of_strings(
            format!("DNS ({name})"),
            local.dns_name.clone().unwrap_or_default(),
            remote_ip.map(|ip| ip.description.clone()),
        ),
        DiffRow::of_strings(
            format!("MAC ({name})"),
            local.mac.to_uppercase(),
            remote.and_then(|r| r.interface.mac_address.clone()),
        ),
    ]
}

fn format_vcpus(vcpus: f64) -> String {
    if vcpus.fract() == 0.0 {
        format!("{vcpus:.0}")
    } else {
        vcpus.to_string()
    }
}
