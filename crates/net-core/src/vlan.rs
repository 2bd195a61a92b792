//! VLAN configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::AddressConfig;

/// 802.1Q VLAN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlanConfig {
    pub name: String,
    /// Parent interface the VLAN is tagged on
    pub parent: String,
    /// VLAN id, 1-4094
    pub vlan_id: u16,
    #[serde(default)]
    pub addresses: Vec<AddressConfig>,
    pub auto_start: bool,
}

impl VlanConfig {
    /// Create a new VLAN configuration, validating the VLAN id
    pub fn new(
        name: impl Into<String>,
        parent: impl Into<String>,
        vlan_id: u16,
    ) -> Result<Self, ConfigError> {
        if vlan_id == 0 || vlan_id > 4094 {
            return Err(ConfigError::InvalidVlanId(vlan_id));
        }
        Ok(Self {
            name: name.into(),
            parent: parent.into(),
            vlan_id,
            addresses: Vec::new(),
            auto_start: true,
        })
    }

    /// Add an address
    pub fn with_address(mut self, address: AddressConfig) -> Self {
        self.addresses.push(address);
        self
    }

    /// Set whether the VLAN comes up at boot
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}
