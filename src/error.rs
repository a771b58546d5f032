//! Error types for the DNS filter.

use std::io;

use thiserror::Error;

use crate::blocklist::loader::LoadError;
use crate::blocklist::store::StoreError;

/// Main error type for filter operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("tunnel startup failed: {0}")]
    Startup(#[from] StartupError),

    #[error("tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    #[error("blocklist load error: {0}")]
    Blocklist(#[from] LoadError),

    #[error("blocklist store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("packet pump task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tunnel.session_label cannot be empty")]
    EmptySessionLabel,

    #[error("tunnel.interface_name cannot be empty")]
    EmptyInterfaceName,

    #[error("tunnel.interface_name {name:?} is longer than {max} bytes")]
    InterfaceNameTooLong { name: String, max: usize },

    #[error("invalid route prefix {value:?}")]
    InvalidRoute { value: String },

    #[error("blocklist entry domain cannot be empty")]
    EmptyBlocklistDomain,

    #[error("blocklist entry {domain:?} has an empty category")]
    EmptyBlocklistCategory { domain: String },

    #[error("blocklist import has an empty file path")]
    EmptyImportPath,
}

/// Failures while acquiring the tunnel device from the host.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("a tunnel is already active for this session")]
    AlreadyActive,

    #[error("host denied the tunnel request: {0}")]
    Denied(String),

    #[error("failed to establish tunnel device: {0}")]
    Device(#[source] io::Error),
}

impl StartupError {
    /// Classify an I/O failure coming back from the host network stack.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::Denied(err.to_string()),
            _ => Self::Device(err),
        }
    }
}

/// I/O failures on an established tunnel device.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("failed to read from tunnel: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write to tunnel: {0}")]
    Write(#[source] io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_permission_denied_as_denial() {
        let err = StartupError::from_io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "operation not permitted",
        ));
        assert!(matches!(err, StartupError::Denied(_)));
    }

    #[test]
    fn should_keep_other_io_failures_as_device_errors() {
        let err = StartupError::from_io(io::Error::new(io::ErrorKind::NotFound, "no /dev/net/tun"));
        assert!(matches!(err, StartupError::Device(_)));
    }
}
