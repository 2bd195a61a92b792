//! Core network types shared by every backend

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Type of native network configuration ecosystem on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Ubuntu/Debian declarative YAML (netplan)
    Netplan,
    /// RHEL 8+/Rocky/AlmaLinux/Fedora key files (NetworkManager)
    NetworkManager,
    /// RHEL 7/CentOS 7 ifcfg shell-variable files
    #[serde(rename = "network-scripts")]
    NetworkScripts,
    /// Debian auto/iface stanzas
    Ifupdown,
    /// No supported ecosystem detected; persistence is disabled
    None,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendType::Netplan => "netplan",
            BackendType::NetworkManager => "networkmanager",
            BackendType::NetworkScripts => "network-scripts",
            BackendType::Ifupdown => "ifupdown",
            BackendType::None => "none",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BackendType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "netplan" => Ok(BackendType::Netplan),
            "networkmanager" => Ok(BackendType::NetworkManager),
            "network-scripts" => Ok(BackendType::NetworkScripts),
            "ifupdown" => Ok(BackendType::Ifupdown),
            "none" => Ok(BackendType::None),
            other => Err(ConfigError::InvalidValue {
                field: "backend".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// An IPv4 address with its CIDR prefix length
///
/// Immutable value; construct through [`AddressConfig::new`] so the
/// prefix length invariant holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressConfig {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl AddressConfig {
    /// Create a new address, validating the prefix length
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, ConfigError> {
        if prefix_len > 32 {
            return Err(ConfigError::InvalidPrefixLength(prefix_len));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    /// Dotted-decimal netmask for the prefix length
    pub fn netmask(&self) -> Ipv4Addr {
        // prefix_len is validated at construction
        Ipv4Net::new(self.address, self.prefix_len)
            .map(|net| net.netmask())
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }
}

impl fmt::Display for AddressConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for AddressConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            field: "address".to_string(),
            value: s.to_string(),
        };

        let (addr_str, prefix_str) = s.split_once('/').ok_or_else(invalid)?;
        let address: Ipv4Addr = addr_str.parse().map_err(|_| invalid())?;
        let prefix_len: u8 = prefix_str.parse().map_err(|_| invalid())?;
        AddressConfig::new(address, prefix_len)
    }
}
