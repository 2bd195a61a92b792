//! hostnet Network Core
//!
//! Backend-agnostic configuration model and error types for durable
//! host network configuration

pub mod bond;
pub mod bridge;
pub mod error;
pub mod interface;
pub mod types;
pub mod vlan;

pub use bond::{BondConfig, BondMode};
pub use bridge::BridgeConfig;
pub use error::{ConfigError, DetectionError, NetworkError};
pub use interface::InterfaceConfig;
pub use types::{AddressConfig, BackendType};
pub use vlan::VlanConfig;

/// Result type for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;
