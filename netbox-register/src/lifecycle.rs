//! Lifecycle of one host's inventory record
//!
//! - register: absent -> present (VM, then interface + IP per eligible interface)
//! - delete: present -> absent
//! - update: delete followed by register, tolerating an absent record
//! - compare: read-only, any state
//!
//! Update is not a diff-based patch: whatever the record held that cannot be
//! rebuilt from local facts is lost.

use crate::config::RegistrationSettings;
use crate::discovery::{NetworkInterface, SystemFacts};
use crate::error::RegisterError;
use crate::inventory::{
    InventoryApi, InventoryError, IpAddressRecord, NewIpAddress, NewVirtualMachine,
    NewVmInterface, VirtualMachine, VirtualMachinePatch, VmInterface,
};
use crate::reconcile::{compare, Comparison, InventoryRecord};
use std::fmt;
use std::net::Ipv4Addr;
use tracing::{error, info, warn};

/// Registration step that failed for an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStep {
    Interface,
    IpAddress,
    PrimaryIp,
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailedStep::Interface => "interface",
            FailedStep::IpAddress => "IP address",
            FailedStep::PrimaryIp => "primary IP",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceFailure {
    pub name: String,
    pub step: FailedStep,
    pub error: InventoryError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredInterface {
    pub interface: VmInterface,
    pub ip: Option<IpAddressRecord>,
    pub primary: bool,
}

/// What a registration created, and what it could not
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationReport {
    pub vm: VirtualMachine,
    pub interfaces: Vec<RegisteredInterface>,
    pub failures: Vec<InterfaceFailure>,
}

impl RegistrationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies local facts to the inventory
pub struct Registrar<'a> {
    client: &'a dyn InventoryApi,
    settings: &'a RegistrationSettings,
}

impl<'a> Registrar<'a> {
    pub fn new(client: &'a dyn InventoryApi, settings: &'a RegistrationSettings) -> Self {
        Self { client, settings }
    }

    /// Create the host's record; an existing record is an error, not a no-op
    pub fn register(&self, facts: &SystemFacts) -> Result<RegistrationReport, RegisterError> {
        if self.client.find_vm_by_name(&facts.hostname)?.is_some() {
            return Err(RegisterError::AlreadyExists(facts.hostname.clone()));
        }

        let vm = self.client.create_vm(&NewVirtualMachine {
            name: facts.hostname.clone(),
            vcpus: facts.vcpus,
            memory: facts.memory_mb,
            disk: facts.disk_gb,
            cluster: self.settings.cluster,
            role: self.settings.role,
            platform: self.settings.platform,
        })?;
        info!("Created \"{}\".", vm.name);

        let mut interfaces = Vec::new();
        let mut failures = Vec::new();
        for local in facts.eligible_interfaces() {
            if let Some(registered) = self.register_interface(&vm, local, &mut failures) {
                interfaces.push(registered);
            }
        }

        Ok(RegistrationReport {
            vm,
            interfaces,
            failures,
        })
    }

    /// Interface, then its IP, then the primary-IP patch; failures stay local to this interface
    fn register_interface(
        &self,
        vm: &VirtualMachine,
        local: &NetworkInterface,
        failures: &mut Vec<InterfaceFailure>,
    ) -> Option<RegisteredInterface> {
        let ip = local.ip?;
        let mut fail = |step: FailedStep, error: InventoryError| {
            error!("Error while creating {} for \"{}\": {}", step, local.name, error);
            failures.push(InterfaceFailure {
                name: local.name.clone(),
                step,
                error,
            });
        };

        let interface = match self
            .client
            .create_interface(&NewVmInterface::new(vm.id, &local.name, &local.mac))
        {
            Ok(interface) => interface,
            Err(e) => {
                fail(FailedStep::Interface, e);
                return None;
            }
        };
        info!("Created interface \"{}\".", interface.name);

        let description = local.dns_name.as_deref().unwrap_or_default();
        let new_ip = NewIpAddress::for_interface(interface.id, &ip.to_string(), description);
        let ip_record = match self.client.create_ip(&new_ip) {
            Ok(record) => record,
            Err(e) => {
                fail(FailedStep::IpAddress, e);
                return Some(RegisteredInterface {
                    interface,
                    ip: None,
                    primary: false,
                });
            }
        };
        info!("Created IP address \"{}\" for NIC \"{}\".", ip, interface.name);

        let mut primary = false;
        if self.is_management_address(ip) {
            let patch = VirtualMachinePatch {
                name: Some(vm.name.clone()),
                primary_ip4: Some(ip_record.id),
            };
            match self.client.update_vm(vm.id, &patch) {
                Ok(_) => {
                    info!("Set {} as primary IP of \"{}\".", ip, vm.name);
                    primary = true;
                }
                Err(e) => fail(FailedStep::PrimaryIp, e),
            }
        }

        Some(RegisteredInterface {
            interface,
            ip: Some(ip_record),
            primary,
        })
    }

    fn is_management_address(&self, ip: Ipv4Addr) -> bool {
        self.settings
            .management_ranges
            .iter()
            .any(|range| range.contains(&ip))
    }

    /// Remove the host's record; an absent record is `NotFound`
    pub fn delete(&self, hostname: &str) -> Result<VirtualMachine, RegisterError> {
        let vm = self
            .client
            .find_vm_by_name(hostname)?
            .ok_or_else(|| RegisterError::NotFound(hostname.to_string()))?;

        self.client.delete_vm(vm.id)?;
        info!("Deleted \"{}\" from netbox.", vm.name);
        Ok(vm)
    }

    /// Delete then register; degrades to a plain register when nothing exists yet
    pub fn update(&self, facts: &SystemFacts) -> Result<RegistrationReport, RegisterError> {
        match self.delete(&facts.hostname) {
            Ok(_) => {}
            Err(RegisterError::NotFound(hostname)) => {
                warn!("\"{}\" was not registered, registering it now", hostname);
            }
            Err(e) => return Err(e),
        }

        self.register(facts)
    }

    /// Diff local facts against the stored record
    pub fn compare(&self, facts: &SystemFacts) -> Result<Comparison, RegisterError> {
        let record = InventoryRecord::fetch(self.client, &facts.hostname)?;

        Ok(Comparison {
            hostname: facts.hostname.clone(),
            rows: compare(facts, &record),
        })
    }
}
