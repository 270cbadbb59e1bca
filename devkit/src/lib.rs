/*!
# netbox-devkit - stubs and helpers for testing netbox-register

- `MockInventory`: in-memory `InventoryApi` that assigns ids, records every
  call and can inject failures
- `FactsBuilder`: terse construction of `SystemFacts`
- `TestHarness`: a mock inventory plus registration settings, ready to hand
  out a `Registrar`
*/

pub mod inventory_stub;
pub mod test_utils;

pub use inventory_stub::{MockCall, MockInventory};
pub use test_utils::{FactsBuilder, TestHarness};
