//! netbox-register - keeps a host's NetBox virtual machine record in line with the host
//!
//! This crate provides:
//! - System discovery (CPU, memory, disk, interfaces)
//! - A blocking NetBox client behind the `InventoryApi` trait
//! - The compare engine and register/delete/update operations

pub mod config;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod reconcile;
pub mod report;

pub use config::{Config, RegistrationSettings};
pub use discovery::{InterfaceFilter, NetworkInterface, SystemFacts};
pub use error::RegisterError;
pub use inventory::{InventoryApi, InventoryError, NetboxClient};
pub use lifecycle::{Registrar, RegistrationReport};
pub use reconcile::{compare, Comparison, DiffRow, InventoryRecord};
