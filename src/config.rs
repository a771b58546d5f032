//! Configuration loading and validation.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::blocklist::BlocklistEntry;
use crate::error::{ConfigError, Result, ValidationError};

/// Longest interface name the kernel accepts (`IFNAMSIZ` minus the NUL).
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Main configuration for the DNS filter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Tunnel device settings.
    #[serde(default)]
    pub tunnel: TunnelConfig,

    /// Where blocked domains come from.
    #[serde(default)]
    pub blocklist: BlocklistSettings,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Parameters handed to the host when requesting the tunnel device.
///
/// Built once before the session starts and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TunnelConfig {
    /// Address assigned to the tunnel interface.
    #[serde(default = "default_local_address")]
    pub local_address: Ipv4Addr,

    /// Traffic routed through the tunnel (e.g., "0.0.0.0/0").
    #[serde(default = "default_route", deserialize_with = "deserialize_route")]
    pub route: RoutePrefix,

    /// DNS server advertised to the host while the tunnel is up.
    #[serde(default = "default_upstream_dns")]
    pub upstream_dns: Ipv4Addr,

    /// Human readable label for the session.
    #[serde(default = "default_session_label")]
    pub session_label: String,

    /// Name of the TUN interface to create.
    #[serde(default = "default_interface_name")]
    pub interface_name: String,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            local_address: default_local_address(),
            route: default_route(),
            upstream_dns: default_upstream_dns(),
            session_label: default_session_label(),
            interface_name: default_interface_name(),
        }
    }
}

/// An IPv4 route in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePrefix {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl RoutePrefix {
    /// The default route, covering every IPv4 destination.
    pub const DEFAULT: Self = Self {
        address: Ipv4Addr::UNSPECIFIED,
        prefix_len: 0,
    };
}

impl FromStr for RoutePrefix {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidRoute {
            value: s.to_string(),
        };

        let (address, prefix_len) = s.split_once('/').ok_or_else(invalid)?;
        let address = address.trim().parse().map_err(|_| invalid())?;
        let prefix_len: u8 = prefix_len.trim().parse().map_err(|_| invalid())?;
        if prefix_len > 32 {
            return Err(invalid());
        }

        Ok(Self {
            address,
            prefix_len,
        })
    }
}

impl fmt::Display for RoutePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Blocklist sources, merged in order: store, inline entries, imports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlocklistSettings {
    /// JSON file holding the persisted entries. Built-in defaults are used
    /// when unset or when the file does not exist yet.
    pub store_path: Option<PathBuf>,

    /// Entries declared directly in the config file.
    #[serde(default)]
    pub entries: Vec<BlocklistEntry>,

    /// Plain domain-list files imported under a category.
    #[serde(default)]
    pub imports: Vec<BlocklistImport>,
}

/// A domain-list file whose domains are all blocked under one category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlocklistImport {
    pub path: PathBuf,

    #[serde(default)]
    pub format: BlocklistFormat,

    #[serde(default = "default_import_category")]
    pub category: String,
}

/// Supported formats for imported blocklist files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlocklistFormat {
    /// One domain per line.
    #[default]
    Domains,
    /// `/etc/hosts` style, `0.0.0.0 domain` lines.
    Hosts,
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Expose a Prometheus `/metrics` endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// Address the exporter listens on.
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

const fn default_local_address() -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, 2)
}

const fn default_route() -> RoutePrefix {
    RoutePrefix::DEFAULT
}

const fn default_upstream_dns() -> Ipv4Addr {
    Ipv4Addr::new(1, 1, 1, 1)
}

fn default_session_label() -> String {
    "Dumbify DNS Filter".to_string()
}

fn default_interface_name() -> String {
    "dumbify0".to_string()
}

fn default_import_category() -> String {
    "imported".to_string()
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9091))
}

fn deserialize_route<'de, D>(deserializer: D) -> std::result::Result<RoutePrefix, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let tunnel = &self.tunnel;
        if tunnel.session_label.trim().is_empty() {
            return Err(ValidationError::EmptySessionLabel);
        }
        if tunnel.interface_name.is_empty() {
            return Err(ValidationError::EmptyInterfaceName);
        }
        if tunnel.interface_name.len() > MAX_INTERFACE_NAME_LEN {
            return Err(ValidationError::InterfaceNameTooLong {
                name: tunnel.interface_name.clone(),
                max: MAX_INTERFACE_NAME_LEN,
            });
        }

        for entry in &self.blocklist.entries {
            if entry.domain.is_empty() {
                return Err(ValidationError::EmptyBlocklistDomain);
            }
            if entry.category.trim().is_empty() {
                return Err(ValidationError::EmptyBlocklistCategory {
                    domain: entry.domain.clone(),
                });
            }
        }

        if self
            .blocklist
            .imports
            .iter()
            .any(|import| import.path.as_os_str().is_empty())
        {
            return Err(ValidationError::EmptyImportPath);
        }

        Ok(())
    }
}
