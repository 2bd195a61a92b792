//! Error types for network persistence operations

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for network persistence operations
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Reload command `{command}` failed: {output}")]
    Reload { command: String, output: String },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl NetworkError {
    /// Wrap an I/O error with the artifact path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NetworkError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Backend construction and detection errors
///
/// Raised once, at construction time, so the factory fails fast
/// instead of every later Save/Delete call failing.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("required command not found: {command}")]
    MissingCommand { command: String },

    #[error("configuration directory not found: {path}")]
    MissingDirectory { path: PathBuf },

    #[error("service is not active: {service}")]
    ServiceInactive { service: String },
}

/// Configuration value errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("invalid VLAN id: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}
