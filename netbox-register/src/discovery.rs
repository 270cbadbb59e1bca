//! System discovery for inventory registration
//!
//! This module handles:
//! - System identification (hostname)
//! - vCPU count, memory size and root filesystem size
//! - Network interface enumeration with MAC, IPv4 and reverse DNS name
//! - The lossy size rounding shared by register and compare

use crate::error::RegisterError;
use anyhow::{anyhow, bail, Context, Result};
use if_addrs::{get_if_addrs, IfAddr};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use sysinfo::{Disks, System};
use tracing::{debug, info};

const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

/// Network interface as seen on this host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub mac: String,
    /// First IPv4 address, absent when the interface only carries IPv6
    pub ip: Option<Ipv4Addr>,
    /// Reverse lookup of `ip`
    pub dns_name: Option<String>,
}

impl NetworkInterface {
    /// Loopback and address-less interfaces are never compared or registered
    pub fn is_eligible(&self) -> bool {
        match self.ip {
            Some(ip) => self.name != "lo" && !ip.is_loopback(),
            None => false,
        }
    }
}

/// Local facts compared against and pushed to the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFacts {
    pub hostname: String,
    pub vcpus: u32,
    /// Rounded, see [`memory_mb_from_bytes`]
    pub memory_mb: u64,
    /// Rounded, see [`disk_gb_from_bytes`]
    pub disk_gb: u64,
    pub interfaces: Vec<NetworkInterface>,
}

impl SystemFacts {
    /// Discover facts for this host, keeping interfaces accepted by `filter`
    pub fn discover(filter: &InterfaceFilter) -> Result<Self, RegisterError> {
        Self::probe(filter).map_err(|e| RegisterError::FactsUnavailable(format!("{e:#}")))
    }

    fn probe(filter: &InterfaceFilter) -> Result<Self> {
        info!("Starting system discovery...");

        let hostname = local_hostname()?;

        let mut sys = System::new_all();
        sys.refresh_all();

        let vcpus = sys.cpus().len();
        if vcpus == 0 {
            bail!("no CPUs reported");
        }

        let memory_bytes = sys.total_memory();
        if memory_bytes == 0 {
            bail!("total memory reported as zero");
        }

        let disk_bytes = root_disk_bytes().context("Failed to read root filesystem size")?;
        let interfaces =
            discover_interfaces(filter).context("Failed to enumerate network interfaces")?;

        let facts = SystemFacts {
            hostname,
            vcpus: u32::try_from(vcpus).context("CPU count out of range")?,
            memory_mb: memory_mb_from_bytes(memory_bytes),
            disk_gb: disk_gb_from_bytes(disk_bytes),
            interfaces,
        };

        info!(
            "Discovery complete - Hostname: {}, vCPUs: {}, Memory: {} MB, Disk: {} GB, {} interfaces",
            facts.hostname,
            facts.vcpus,
            facts.memory_mb,
            facts.disk_gb,
            facts.interfaces.len()
        );

        Ok(facts)
    }

    /// Interfaces that take part in compare and register
    pub fn eligible_interfaces(&self) -> impl Iterator<Item = &NetworkInterface> {
        self.interfaces.iter().filter(|i| i.is_eligible())
    }
}

/// Naming convention an interface must follow to be inventoried
#[derive(Debug, Clone)]
pub struct InterfaceFilter {
    prefix: String,
}

impl InterfaceFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn accepts(&self, name: &str) -> bool {
        name != "lo" && name.starts_with(&self.prefix)
    }
}

/// Name this host is registered under
pub fn hostname() -> Result<String, RegisterError> {
    local_hostname().map_err(|e| RegisterError::FactsUnavailable(format!("{e:#}")))
}

fn local_hostname() -> Result<String> {
    let hostname = gethostname::gethostname().to_string_lossy().to_string();
    if hostname.is_empty() {
        bail!("hostname is empty");
    }
    Ok(hostname)
}

/// `ceil(value * 10^decimals) / 10^decimals`; negative `decimals` round to tens, hundreds, ...
pub fn round_up(value: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let multiplier = 10f64.powi(decimals);
        (value * multiplier).ceil() / multiplier
    } else {
        let divisor = 10f64.powi(-decimals);
        (value / divisor).ceil() * divisor
    }
}

/// Disk size in GB, rounded up to the next 10 GiB
pub fn disk_gb_from_bytes(bytes: u64) -> u64 {
    round_up(bytes as f64 / BYTES_PER_GIB, -1) as u64
}

/// Memory size in MB, rounded up to the next 10 GiB
pub fn memory_mb_from_bytes(bytes: u64) -> u64 {
    disk_gb_from_bytes(bytes) * 1024
}

fn root_disk_bytes() -> Result<u64> {
    let disks = Disks::new_with_refreshed_list();
    let root = Path::new("/");

    disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == root)
        .map(|disk| disk.total_space())
        .filter(|total| *total > 0)
        .ok_or_else(|| anyhow!("no filesystem mounted at /"))
}

fn discover_interfaces(filter: &InterfaceFilter) -> Result<Vec<NetworkInterface>> {
    debug!("Enumerating network interfaces...");

    let if_addrs = get_if_addrs()?;
    let mut interfaces: Vec<NetworkInterface> = Vec::new();

    for if_addr in if_addrs {
        if if_addr.is_loopback() || !filter.accepts(&if_addr.name) {
            continue;
        }

        let ipv4 = match &if_addr.addr {
            IfAddr::V4(v4) => Some(v4.ip),
            IfAddr::V6(_) => None,
        };

        if let Some(existing) = interfaces.iter_mut().find(|i| i.name == if_addr.name) {
            if existing.ip.is_none() {
                existing.ip = ipv4;
            }
            continue;
        }

        let Some(mac) = interface_mac(&if_addr.name) else {
            continue;
        };

        debug!("Found interface: {} ({})", if_addr.name, mac);
        interfaces.push(NetworkInterface {
            name: if_addr.name,
            mac,
            ip: ipv4,
            dns_name: None,
        });
    }

    for interface in &mut interfaces {
        if let Some(ip) = interface.ip {
            interface.dns_name = reverse_lookup(ip);
        } else {
            debug!("Skipping {}: no IPv4 address", interface.name);
        }
    }

    Ok(interfaces)
}

fn interface_mac(interface_name: &str) -> Option<String> {
    match mac_address::mac_address_by_name(interface_name) {
        Ok(Some(mac)) => Some(format_mac(&mac)),
        Ok(None) => {
            debug!("No MAC found for interface: {}", interface_name);
            None
        }
        Err(e) => {
            debug!("Error getting MAC for {}: {}", interface_name, e);
            None
        }
    }
}

fn format_mac(mac: &MacAddress) -> String {
    let b = mac.bytes();
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b[0], b[1], b[2], b[3], b[4], b[5]
    )
}

fn reverse_lookup(ip: Ipv4Addr) -> Option<String> {
    match dns_lookup::lookup_addr(&IpAddr::V4(ip)) {
        Ok(name) => Some(name),
        Err(e) => {
            debug!("Reverse lookup of {} failed: {}", ip, e);
            None
        }
    }
}
