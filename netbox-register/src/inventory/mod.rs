//! Inventory API access
//!
//! `InventoryApi` is the seam between the lifecycle operations and the
//! remote store: `NetboxClient` talks to a real NetBox, tests plug in an
//! in-memory implementation.

pub mod client;
pub mod models;

pub use client::NetboxClient;
pub use models::{
    IpAddressRecord, NewIpAddress, NewVirtualMachine, NewVmInterface, VirtualMachine,
    VirtualMachinePatch, VmInterface,
};

/// Failure of a single inventory API call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("unauthorized: {}{message}", status_prefix(.status))]
    Unauthorized { status: Option<u16>, message: String },
    #[error("{}{message}", status_prefix(.status))]
    Remote { status: Option<u16>, message: String },
}

fn status_prefix(status: &Option<u16>) -> String {
    status.map(|s| format!("HTTP {s}: ")).unwrap_or_default()
}

impl InventoryError {
    /// Map a non-2xx response to an error, pulling NetBox's `detail` when present
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            401 | 403 => InventoryError::Unauthorized {
                status: Some(status),
                message,
            },
            _ => InventoryError::Remote {
                status: Some(status),
                message,
            },
        }
    }
}

/// CRUD over the VM, interface and IP-address resources of one inventory
pub trait InventoryApi {
    fn find_vm_by_name(&self, name: &str) -> Result<Option<VirtualMachine>, InventoryError>;

    fn create_vm(&self, vm: &NewVirtualMachine) -> Result<VirtualMachine, InventoryError>;

    fn delete_vm(&self, id: u64) -> Result<(), InventoryError>;

    fn update_vm(
        &self,
        id: u64,
        patch: &VirtualMachinePatch,
    ) -> Result<VirtualMachine, InventoryError>;

    fn list_interfaces(&self, vm_id: u64) -> Result<Vec<VmInterface>, InventoryError>;

    fn create_interface(&self, interface: &NewVmInterface) -> Result<VmInterface, InventoryError>;

    fn find_ip_by_interface(
        &self,
        interface_id: u64,
    ) -> Result<Option<IpAddressRecord>, InventoryError>;

    fn create_ip(&self, ip: &NewIpAddress) -> Result<IpAddressRecord, InventoryError>;
}
