//! Bond configuration and bonding modes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::AddressConfig;

/// Link aggregation policy for a bond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondMode {
    #[serde(rename = "balance-rr")]
    RoundRobin,
    #[serde(rename = "active-backup")]
    ActiveBackup,
    #[serde(rename = "balance-xor")]
    Xor,
    #[serde(rename = "broadcast")]
    Broadcast,
    #[serde(rename = "802.3ad")]
    Ieee8023ad,
    #[serde(rename = "balance-tlb")]
    BalanceTlb,
    #[serde(rename = "balance-alb")]
    BalanceAlb,
}

impl fmt::Display for BondMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BondMode::RoundRobin => "balance-rr",
            BondMode::ActiveBackup => "active-backup",
            BondMode::Xor => "balance-xor",
            BondMode::Broadcast => "broadcast",
            BondMode::Ieee8023ad => "802.3ad",
            BondMode::BalanceTlb => "balance-tlb",
            BondMode::BalanceAlb => "balance-alb",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BondMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" | "balance-rr" => Ok(BondMode::RoundRobin),
            "1" | "active-backup" => Ok(BondMode::ActiveBackup),
            "2" | "balance-xor" => Ok(BondMode::Xor),
            "3" | "broadcast" => Ok(BondMode::Broadcast),
            "4" | "802.3ad" => Ok(BondMode::Ieee8023ad),
            "5" | "balance-tlb" => Ok(BondMode::BalanceTlb),
            "6" | "balance-alb" => Ok(BondMode::BalanceAlb),
            other => Err(ConfigError::InvalidValue {
                field: "bond_mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Bond (link aggregation) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondConfig {
    pub name: String,
    pub mode: BondMode,
    /// Member interfaces enslaved to the bond
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<AddressConfig>,
    pub auto_start: bool,
}

impl BondConfig {
    /// Create a new bond configuration with no members
    pub fn new(name: impl Into<String>, mode: BondMode) -> Self {
        Self {
            name: name.into(),
            mode,
            members: Vec::new(),
            addresses: Vec::new(),
            auto_start: true,
        }
    }

    /// Add a member interface
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Add an address
    pub fn with_address(mut self, address: AddressConfig) -> Self {
        self.addresses.push(address);
        self
    }

    /// Set whether the bond comes up at boot
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}
