//! Blocking NetBox REST client
//!
//! Endpoints used:
//! - `/api/virtualization/virtual-machines/`
//! - `/api/virtualization/interfaces/`
//! - `/api/ipam/ip-addresses/`

use super::models::{
    IpAddressRecord, NewIpAddress, NewVirtualMachine, NewVmInterface, Page, VirtualMachine,
    VirtualMachinePatch, VmInterface,
};
use super::{InventoryApi, InventoryError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const VIRTUAL_MACHINES: &str = "virtualization/virtual-machines";
const INTERFACES: &str = "virtualization/interfaces";
const IP_ADDRESSES: &str = "ipam/ip-addresses";

/// Authenticated handle on one NetBox instance
pub struct NetboxClient {
    http: Client,
    base_url: String,
}

impl NetboxClient {
    /// Build a client for `host`, authenticating every request with `token`
    pub fn new(host: &str, token: &str) -> Result<Self, InventoryError> {
        let mut auth = HeaderValue::from_str(&format!("Token {token}")).map_err(|_| {
            InventoryError::Unauthorized {
                status: None,
                message: "token contains characters not allowed in an HTTP header".to_string(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("netbox-register/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;

        let base_url = normalize_base_url(host);
        debug!("Inventory API at {}", base_url);

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, resource: &str) -> String {
        format!("{}/api/{}/", self.base_url, resource)
    }

    fn object_url(&self, resource: &str, id: u64) -> String {
        format!("{}/api/{}/{}/", self.base_url, resource, id)
    }

    fn execute(&self, request: RequestBuilder) -> Result<Response, InventoryError> {
        let response = request.send().map_err(transport_error)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(InventoryError::from_response(status.as_u16(), &body))
    }

    fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, InventoryError> {
        self.execute(request)?.json().map_err(transport_error)
    }

    /// GET a filtered list, following `next` links until exhausted
    fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, InventoryError> {
        let first = self.http.get(self.collection_url(resource)).query(query);
        let mut page: Page<T> = self.json(first)?;
        let mut items = std::mem::take(&mut page.results);

        while let Some(next) = page.next.take() {
            page = self.json(self.http.get(next))?;
            items.append(&mut page.results);
        }

        Ok(items)
    }

    fn first<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, InventoryError> {
        let mut items: Vec<T> = self.list(resource, query)?;
        if items.len() > 1 {
            warn!("{} matched {} objects, using the first", resource, items.len());
        }
        Ok(if items.is_empty() {
            None
        } else {
            Some(items.swap_remove(0))
        })
    }
}

impl InventoryApi for NetboxClient {
    fn find_vm_by_name(&self, name: &str) -> Result<Option<VirtualMachine>, InventoryError> {
        self.first(VIRTUAL_MACHINES, &[("name", name.to_string())])
    }

    fn create_vm(&self, vm: &NewVirtualMachine) -> Result<VirtualMachine, InventoryError> {
        self.json(self.http.post(self.collection_url(VIRTUAL_MACHINES)).json(vm))
    }

    fn delete_vm(&self, id: u64) -> Result<(), InventoryError> {
        self.execute(self.http.delete(self.object_url(VIRTUAL_MACHINES, id)))?;
        Ok(())
    }

    fn update_vm(
        &self,
        id: u64,
        patch: &VirtualMachinePatch,
    ) -> Result<VirtualMachine, InventoryError> {
        self.json(self.http.patch(self.object_url(VIRTUAL_MACHINES, id)).json(patch))
    }

    fn list_interfaces(&self, vm_id: u64) -> Result<Vec<VmInterface>, InventoryError> {
        self.list(
            INTERFACES,
            &[
                ("virtual_machine_id", vm_id.to_string()),
                ("limit", "0".to_string()),
            ],
        )
    }

    fn create_interface(&self, interface: &NewVmInterface) -> Result<VmInterface, InventoryError> {
        self.json(self.http.post(self.collection_url(INTERFACES)).json(interface))
    }

    fn find_ip_by_interface(
        &self,
        interface_id: u64,
    ) -> Result<Option<IpAddressRecord>, InventoryError> {
        self.first(IP_ADDRESSES, &[("vminterface_id", interface_id.to_string())])
    }

    fn create_ip(&self, ip: &NewIpAddress) -> Result<IpAddressRecord, InventoryError> {
        self.json(self.http.post(self.collection_url(IP_ADDRESSES)).json(ip))
    }
}

fn transport_error(err: reqwest::Error) -> InventoryError {
    InventoryError::Remote {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

/// `netbox.local` -> `http://netbox.local`; trailing `/` and `/api` are dropped
pub fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let host = host.strip_suffix("/api").unwrap_or(host);

    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
