//! Bridge configuration

use serde::{Deserialize, Serialize};

use crate::types::AddressConfig;

/// Software bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub name: String,
    /// Member interfaces enslaved to the bridge (may be empty)
    #[serde(default)]
    pub members: Vec<String>,
    /// Spanning Tree Protocol toggle
    pub stp: bool,
    #[serde(default)]
    pub addresses: Vec<AddressConfig>,
    pub auto_start: bool,
}

impl BridgeConfig {
    /// Create a new bridge configuration with no members
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            stp: false,
            addresses: Vec::new(),
            auto_start: true,
        }
    }

    /// Add a member interface
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Set STP
    pub fn with_stp(mut self, stp: bool) -> Self {
        self.stp = stp;
        self
    }

    /// Add an address
    pub fn with_address(mut self, address: AddressConfig) -> Self {
        self.addresses.push(address);
        self
    }

    /// Set whether the bridge comes up at boot
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}
