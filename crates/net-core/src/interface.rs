//! Plain interface configuration

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::types::AddressConfig;

/// Network interface configuration
///
/// Transient value object: constructed per request, passed by value
/// into a Save/Delete call and never retained by the persistence
/// subsystem. The durable entity is the file(s) on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    #[serde(default)]
    pub addresses: Vec<AddressConfig>,
    pub gateway: Option<Ipv4Addr>,
    pub mtu: Option<u32>,
    pub auto_start: bool,
}

impl InterfaceConfig {
    /// Create a new interface configuration with no addresses
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addresses: Vec::new(),
            gateway: None,
            mtu: None,
            auto_start: true,
        }
    }

    /// Add an address
    pub fn with_address(mut self, address: AddressConfig) -> Self {
        self.addresses.push(address);
        self
    }

    /// Set the default gateway
    pub fn with_gateway(mut self, gateway: Ipv4Addr) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the MTU
    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Set whether the interface comes up at boot
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}
