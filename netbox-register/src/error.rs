//! Error taxonomy and the process exit codes each error maps to.

use crate::config::ConfigError;
use crate::inventory::InventoryError;

/// Exit code for a successful run with no differences.
pub const EXIT_OK: u8 = 0;
/// Exit code for usage, privilege, config, existence and local-facts failures.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for authentication failures and detected differences.
pub const EXIT_MISMATCH: u8 = 2;
/// Exit code for any other inventory API failure.
pub const EXIT_REMOTE: u8 = 3;

/// Top-level error for every register/compare/delete/update operation
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("authentication against the inventory API failed: {0}")]
    Auth(String),
    #[error("inventory API error: {0}")]
    Remote(InventoryError),
    #[error("\"{0}\" does already exist")]
    AlreadyExists(String),
    #[error("\"{0}\" does not exist")]
    NotFound(String),
    #[error("unable to collect system facts: {0}")]
    FactsUnavailable(String),
}

impl From<InventoryError> for RegisterError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Unauthorized { .. } => RegisterError::Auth(err.to_string()),
            other => RegisterError::Remote(other),
        }
    }
}

impl RegisterError {
    /// Process exit code reported to the operator
    pub fn exit_code(&self) -> u8 {
        match self {
            RegisterError::Config(_)
            | RegisterError::AlreadyExists(_)
            | RegisterError::NotFound(_)
            | RegisterError::FactsUnavailable(_) => EXIT_FAILURE,
            RegisterError::Auth(_) => EXIT_MISMATCH,
            RegisterError::Remote(_) => EXIT_REMOTE,
        }
    }
}
