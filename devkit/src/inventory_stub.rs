/*!
Mock inventory for developing without a NetBox instance

Keeps VMs, interfaces and IP addresses in memory, assigns ids the way the
server would, and records every call so tests can assert on them.
*/

use netbox_register::inventory::models::NestedIpAddress;
use netbox_register::inventory::{
    InventoryApi, InventoryError, IpAddressRecord, NewIpAddress, NewVirtualMachine,
    NewVmInterface, VirtualMachine, VirtualMachinePatch, VmInterface,
};
use std::sync::{Arc, Mutex};

/// One call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    FindVm(String),
    CreateVm(String),
    DeleteVm(u64),
    UpdateVm { id: u64, primary_ip4: Option<u64> },
    ListInterfaces(u64),
    CreateInterface(String),
    FindIp(u64),
    CreateIp(String),
}

#[derive(Debug, Default)]
struct State {
    last_id: u64,
    vms: Vec<VirtualMachine>,
    /// (vm id, interface)
    interfaces: Vec<(u64, VmInterface)>,
    /// (interface id, address)
    ips: Vec<(u64, IpAddressRecord)>,
    calls: Vec<MockCall>,
    failing_interfaces: Vec<String>,
    failing_ips: Vec<String>,
    reject_token: bool,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn check_token(&self) -> Result<(), InventoryError> {
        if self.reject_token {
            return Err(InventoryError::Unauthorized {
                status: Some(403),
                message: "Invalid token".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found() -> InventoryError {
    InventoryError::Remote {
        status: Some(404),
        message: "Not found.".to_string(),
    }
}

fn bad_request(message: &str) -> InventoryError {
    InventoryError::Remote {
        status: Some(400),
        message: message.to_string(),
    }
}

/// In-memory stand-in for `NetboxClient`
#[derive(Clone, Default)]
pub struct MockInventory {
    state: Arc<Mutex<State>>,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creating an interface named `name` fails with HTTP 500
    pub fn fail_interface(&self, name: &str) -> &Self {
        self.state.lock().unwrap().failing_interfaces.push(name.to_string());
        self
    }

    /// Creating the address `ip` (without prefix length) fails with HTTP 500
    pub fn fail_ip(&self, ip: &str) -> &Self {
        self.state.lock().unwrap().failing_ips.push(ip.to_string());
        self
    }

    /// Every following call answers 403
    pub fn reject_token(&self) -> &Self {
        self.state.lock().unwrap().reject_token = true;
        self
    }

    /// Store a VM as if registered earlier, bypassing call recording
    pub fn seed_vm(&self, vm: &NewVirtualMachine) -> VirtualMachine {
        let mut state = self.state.lock().unwrap();
        let created = VirtualMachine {
            id: state.next_id(),
            name: vm.name.clone(),
            vcpus: Some(f64::from(vm.vcpus)),
            memory: Some(vm.memory),
            disk: Some(vm.disk),
            primary_ip4: None,
        };
        state.vms.push(created.clone());
        created
    }

    /// Overwrite the stored memory of a VM, simulating drift
    pub fn set_memory(&self, name: &str, memory_mb: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(vm) = state.vms.iter_mut().find(|vm| vm.name == name) {
            vm.memory = Some(memory_mb);
        }
    }

    pub fn vm(&self, name: &str) -> Option<VirtualMachine> {
        let state = self.state.lock().unwrap();
        state.vms.iter().find(|vm| vm.name == name).cloned()
    }

    pub fn vm_count(&self) -> usize {
        self.state.lock().unwrap().vms.len()
    }

    pub fn interface_names(&self, vm_id: u64) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .interfaces
            .iter()
            .filter(|(owner, _)| *owner == vm_id)
            .map(|(_, interface)| interface.name.clone())
            .collect()
    }

    pub fn ip_count(&self) -> usize {
        self.state.lock().unwrap().ips.len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// PATCH calls that set a primary IPv4
    pub fn primary_ip_patches(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, MockCall::UpdateVm { primary_ip4: Some(_), .. }))
            .collect()
    }

    /// Calls that would change the inventory
    pub fn write_calls(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(
                    call,
                    MockCall::FindVm(_) | MockCall::ListInterfaces(_) | MockCall::FindIp(_)
                )
            })
            .collect()
    }
}

impl InventoryApi for MockInventory {
    fn find_vm_by_name(&self, name: &str) -> Result<Option<VirtualMachine>, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::FindVm(name.to_string()));
        state.check_token()?;
        Ok(state.vms.iter().find(|vm| vm.name == name).cloned())
    }

    fn create_vm(&self, vm: &NewVirtualMachine) -> Result<VirtualMachine, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::CreateVm(vm.name.clone()));
        state.check_token()?;

        if state.vms.iter().any(|existing| existing.name == vm.name) {
            return Err(bad_request("Virtual machine with this name already exists."));
        }

        let created = VirtualMachine {
            id: state.next_id(),
            name: vm.name.clone(),
            vcpus: Some(f64::from(vm.vcpus)),
            memory: Some(vm.memory),
            disk: Some(vm.disk),
            primary_ip4: None,
        };
        state.vms.push(created.clone());
        tracing::info!("[MOCK] created VM {} ({})", created.name, created.id);
        Ok(created)
    }

    fn delete_vm(&self, id: u64) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::DeleteVm(id));
        state.check_token()?;

        let before = state.vms.len();
        state.vms.retain(|vm| vm.id != id);
        if state.vms.len() == before {
            return Err(not_found());
        }

        let removed: Vec<u64> = state
            .interfaces
            .iter()
            .filter(|(owner, _)| *owner == id)
            .map(|(_, interface)| interface.id)
            .collect();
        state.interfaces.retain(|(owner, _)| *owner != id);
        state.ips.retain(|(interface, _)| !removed.contains(interface));
        Ok(())
    }

    fn update_vm(
        &self,
        id: u64,
        patch: &VirtualMachinePatch,
    ) -> Result<VirtualMachine, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::UpdateVm {
            id,
            primary_ip4: patch.primary_ip4,
        });
        state.check_token()?;

        let primary = match patch.primary_ip4 {
            Some(ip_id) => {
                let (_, ip) = state
                    .ips
                    .iter()
                    .find(|(_, ip)| ip.id == ip_id)
                    .ok_or_else(|| bad_request("Related object not found."))?;
                Some(NestedIpAddress {
                    id: ip.id,
                    address: ip.address.clone(),
                })
            }
            None => None,
        };

        let vm = state
            .vms
            .iter_mut()
            .find(|vm| vm.id == id)
            .ok_or_else(not_found)?;
        if let Some(name) = &patch.name {
            vm.name = name.clone();
        }
        if primary.is_some() {
            vm.primary_ip4 = primary;
        }
        Ok(vm.clone())
    }

    fn list_interfaces(&self, vm_id: u64) -> Result<Vec<VmInterface>, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::ListInterfaces(vm_id));
        state.check_token()?;

        Ok(state
            .interfaces
            .iter()
            .filter(|(owner, _)| *owner == vm_id)
            .map(|(_, interface)| interface.clone())
            .collect())
    }

    fn create_interface(&self, interface: &NewVmInterface) -> Result<VmInterface, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::CreateInterface(interface.name.clone()));
        state.check_token()?;

        if state.failing_interfaces.contains(&interface.name) {
            return Err(InventoryError::Remote {
                status: Some(500),
                message: format!("injected failure for {}", interface.name),
            });
        }
        if !state.vms.iter().any(|vm| vm.id == interface.virtual_machine) {
            return Err(bad_request("Related object not found."));
        }

        let created = VmInterface {
            id: state.next_id(),
            name: interface.name.clone(),
            mac_address: Some(interface.mac_address.to_uppercase()),
        };
        state.interfaces.push((interface.virtual_machine, created.clone()));
        Ok(created)
    }

    fn find_ip_by_interface(
        &self,
        interface_id: u64,
    ) -> Result<Option<IpAddressRecord>, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::FindIp(interface_id));
        state.check_token()?;

        Ok(state
            .ips
            .iter()
            .find(|(owner, _)| *owner == interface_id)
            .map(|(_, ip)| ip.clone()))
    }

    fn create_ip(&self, ip: &NewIpAddress) -> Result<IpAddressRecord, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::CreateIp(ip.address.clone()));
        state.check_token()?;

        let host = ip.address.split('/').next().unwrap_or_default().to_string();
        if state.failing_ips.contains(&host) {
            return Err(InventoryError::Remote {
                status: Some(500),
                message: format!("injected failure for {}", ip.address),
            });
        }
        if !state
            .interfaces
            .iter()
            .any(|(_, interface)| interface.id == ip.assigned_object_id)
        {
            return Err(bad_request("Related object not found."));
        }

        let created = IpAddressRecord {
            id: state.next_id(),
            address: ip.address.clone(),
            description: ip.description.clone(),
        };
        state.ips.push((ip.assigned_object_id, created.clone()));
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_vm(name: &str) -> NewVirtualMachine {
        NewVirtualMachine {
            name: name.to_string(),
            vcpus: 2,
            memory: 10240,
            disk: 20,
            cluster: None,
            role: None,
            platform: None,
        }
    }

    #[test]
    fn test_ids_are_assigned() {
        let mock = MockInventory::new();
        let a = mock.create_vm(&new_vm("a")).unwrap();
        let b = mock.create_vm(&new_vm("b")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(mock.vm_count(), 2);
    }

    #[test]
    fn test_delete_cascades() {
        let mock = MockInventory::new();
        let vm = mock.create_vm(&new_vm("a")).unwrap();
        let interface = mock
            .create_interface(&NewVmInterface::new(vm.id, "eth0", "52:54:00:00:00:01"))
            .unwrap();
        mock.create_ip(&NewIpAddress::for_interface(interface.id, "10.0.0.1", ""))
            .unwrap();

        mock.delete_vm(vm.id).unwrap();
        assert_eq!(mock.vm_count(), 0);
        assert_eq!(mock.ip_count(), 0);
        assert!(mock.interface_names(vm.id).is_empty());
        assert!(matches!(
            mock.delete_vm(vm.id),
            Err(InventoryError::Remote { status: Some(404), .. })
        ));
    }

    #[test]
    fn test_reject_token() {
        let mock = MockInventory::new();
        mock.reject_token();
        assert!(matches!(
            mock.find_vm_by_name("a"),
            Err(InventoryError::Unauthorized { .. })
        ));
    }
}
