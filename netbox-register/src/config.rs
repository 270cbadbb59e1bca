//! Configuration loading
//!
//! The config file is TOML with a mandatory `[main]` table:
//! - `host`: inventory API host (scheme optional, defaults to http)
//! - `token`: API token sent with every request
//!
//! An optional `[register]` table tunes how the host is registered.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Default location of the config file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/netbox-register.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configfile {} does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("config file is missing section [{0}]")]
    MissingSection(&'static str),
    #[error("config file is missing key {0}")]
    MissingKey(&'static str),
    #[error("config key {0} must be a string")]
    InvalidKey(&'static str),
    #[error("error reading {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Fully validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub token: String,
    pub register: RegistrationSettings,
}

/// How the host gets registered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationSettings {
    /// Only interfaces whose name starts with this prefix are considered
    pub interface_prefix: String,
    /// An address inside one of these becomes the VM's primary IP
    pub management_ranges: Vec<Ipv4Net>,
    pub cluster: Option<u64>,
    pub role: Option<u64>,
    pub platform: Option<u64>,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            interface_prefix: "eth".to_string(),
            management_ranges: default_management_ranges(),
            cluster: None,
            role: None,
            platform: None,
        }
    }
}

/// Ranges whose hosts carry the management address of a VM: 172.24.1.0/24 to 172.28.1.0/24
pub fn default_management_ranges() -> Vec<Ipv4Net> {
    (24..=28)
        .filter_map(|octet| Ipv4Net::new(Ipv4Addr::new(172, octet, 1, 0), 24).ok())
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    main: Option<toml::Table>,
    #[serde(default)]
    register: RegistrationSettings,
}

impl Config {
    /// Load and validate the config file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate config text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let main = raw.main.ok_or(ConfigError::MissingSection("main"))?;

        Ok(Config {
            host: required_key(&main, "host")?,
            token: required_key(&main, "token")?,
            register: raw.register,
        })
    }
}

fn required_key(main: &toml::Table, key: &'static str) -> Result<String, ConfigError> {
    let value = main.get(key).ok_or(ConfigError::MissingKey(key))?;
    let value = value.as_str().ok_or(ConfigError::InvalidKey(key))?;
    Ok(value.trim().to_string())
}
