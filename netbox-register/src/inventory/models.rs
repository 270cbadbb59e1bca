//! NetBox resource payloads (virtualization + ipam)

use serde::{Deserialize, Serialize};

/// One page of a NetBox list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub results: Vec<T>,
}

/// Nested reference NetBox embeds for related objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedIpAddress {
    pub id: u64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: u64,
    pub name: String,
    /// Decimal on the NetBox side
    #[serde(default)]
    pub vcpus: Option<f64>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
    #[serde(default)]
    pub primary_ip4: Option<NestedIpAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVirtualMachine {
    pub name: String,
    pub vcpus: u32,
    pub memory: u64,
    pub disk: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<u64>,
}

/// Partial update of a VM; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualMachinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip4: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmInterface {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVmInterface {
    pub virtual_machine: u64,
    pub name: String,
    pub mac_address: String,
    pub mtu: u32,
    pub enabled: bool,
}

impl NewVmInterface {
    pub fn new(virtual_machine: u64, name: &str, mac: &str) -> Self {
        Self {
            virtual_machine,
            name: name.to_string(),
            mac_address: mac.to_uppercase(),
            mtu: 1500,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddressRecord {
    pub id: u64,
    /// CIDR notation, e.g. `172.24.1.10/32`
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl IpAddressRecord {
    /// Address without its prefix length
    pub fn host(&self) -> &str {
        strip_prefix_len(&self.address)
    }
}

pub const VM_INTERFACE_OBJECT_TYPE: &str = "virtualization.vminterface";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIpAddress {
    pub address: String,
    pub status: String,
    pub assigned_object_type: String,
    pub assigned_object_id: u64,
    pub description: String,
}

impl NewIpAddress {
    /// Host address (`/32`) assigned to a VM interface
    pub fn for_interface(interface_id: u64, ip: &str, description: &str) -> Self {
        Self {
            address: format!("{ip}/32"),
            status: "active".to_string(),
            assigned_object_type: VM_INTERFACE_OBJECT_TYPE.to_string(),
            assigned_object_id: interface_id,
            description: description.to_string(),
        }
    }
}

pub fn strip_prefix_len(address: &str) -> &str {
    address.split('/').next().unwrap_or(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_from_netbox_json() {
        let vm: VirtualMachine = serde_json::from_str(
            r#"{
                "id": 42,
                "name": "web01",
                "vcpus": 4.0,
                "memory": 20480,
                "disk": 40,
                "primary_ip4": {"id": 7, "address": "172.24.1.10/32", "family": 4},
                "status": {"value": "active", "label": "Active"}
            }"#,
        )
        .unwrap();

        assert_eq!(vm.id, 42);
        assert_eq!(vm.vcpus, Some(4.0));
        assert_eq!(vm.memory, Some(20480));
        assert_eq!(vm.primary_ip4.unwrap().id, 7);
    }

    #[test]
    fn test_vm_with_null_sizes() {
        let vm: VirtualMachine = serde_json::from_str(
            r#"{"id": 1, "name": "bare", "vcpus": null, "memory": null, "disk": null, "primary_ip4": null}"#,
        )
        .unwrap();
        assert!(vm.vcpus.is_none());
        assert!(vm.memory.is_none());
        assert!(vm.primary_ip4.is_none());
    }

    #[test]
    fn test_page() {
        let page: Page<VmInterface> = serde_json::from_str(
            r#"{"count": 1, "next": null, "previous": null,
                "results": [{"id": 3, "name": "eth0", "mac_address": "52:54:00:AB:CD:EF"}]}"#,
        )
        .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].mac_address.as_deref(), Some("52:54:00:AB:CD:EF"));
    }

    #[test]
    fn test_new_ip_payload() {
        let ip = NewIpAddress::for_interface(3, "172.24.1.10", "web01.example.com");
        let json = serde_json::to_value(&ip).unwrap();
        assert_eq!(json["address"], "172.24.1.10/32");
        assert_eq!(json["assigned_object_type"], "virtualization.vminterface");
        assert_eq!(json["assigned_object_id"], 3);
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = VirtualMachinePatch {
            primary_ip4: Some(7),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"primary_ip4":7}"#);
    }

    #[test]
    fn test_strip_prefix_len() {
        assert_eq!(strip_prefix_len("172.24.1.10/32"), "172.24.1.10");
        assert_eq!(strip_prefix_len("172.24.1.10"), "172.24.1.10");
    }
}
