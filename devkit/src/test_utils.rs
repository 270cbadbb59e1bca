/*!
Test harness for netbox-register

Wires a `MockInventory` to registration settings and builds `SystemFacts`
without touching the real host.
*/

use crate::inventory_stub::MockInventory;
use ipnet::Ipv4Net;
use netbox_register::config::RegistrationSettings;
use netbox_register::discovery::{NetworkInterface, SystemFacts};
use netbox_register::lifecycle::Registrar;
use std::net::Ipv4Addr;

/// Mock inventory plus the settings a `Registrar` runs with
pub struct TestHarness {
    pub inventory: MockInventory,
    pub settings: RegistrationSettings,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();

        Self {
            inventory: MockInventory::new(),
            settings: RegistrationSettings::default(),
        }
    }

    /// Replace the management ranges, e.g. `["10.0.0.0/8"]`
    pub fn with_management_ranges(mut self, ranges: &[&str]) -> Self {
        self.settings.management_ranges = ranges
            .iter()
            .map(|r| r.parse::<Ipv4Net>().expect("valid prefix"))
            .collect();
        self
    }

    pub fn registrar(&self) -> Registrar<'_> {
        Registrar::new(&self.inventory, &self.settings)
    }
}

/// Builder for `SystemFacts`; defaults describe a small VM with no interfaces
pub struct FactsBuilder {
    facts: SystemFacts,
}

impl FactsBuilder {
    pub fn new(hostname: &str) -> Self {
        Self {
            facts: SystemFacts {
                hostname: hostname.to_string(),
                vcpus: 2,
                memory_mb: 10240,
                disk_gb: 20,
                interfaces: Vec::new(),
            },
        }
    }

    pub fn vcpus(mut self, vcpus: u32) -> Self {
        self.facts.vcpus = vcpus;
        self
    }

    pub fn memory_mb(mut self, memory_mb: u64) -> Self {
        self.facts.memory_mb = memory_mb;
        self
    }

    pub fn disk_gb(mut self, disk_gb: u64) -> Self {
        self.facts.disk_gb = disk_gb;
        self
    }

    /// Interface with an IPv4 address that reverse-resolves to `dns_name`
    pub fn interface(mut self, name: &str, mac: &str, ip: &str, dns_name: &str) -> Self {
        self.facts.interfaces.push(NetworkInterface {
            name: name.to_string(),
            mac: mac.to_string(),
            ip: Some(ip.parse::<Ipv4Addr>().expect("valid IPv4 address")),
            dns_name: Some(dns_name.to_string()),
        });
        self
    }

    /// Interface without any IPv4 address
    pub fn interface_without_ip(mut self, name: &str, mac: &str) -> Self {
        self.facts.interfaces.push(NetworkInterface {
            name: name.to_string(),
            mac: mac.to_string(),
            ip: None,
            dns_name: None,
        });
        self
    }

    pub fn build(self) -> SystemFacts {
        self.facts
    }
}
