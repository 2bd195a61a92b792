//! netplan backend: one declarative YAML document per entity

use std::path::PathBuf;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

use hostnet_core::{
    BackendType, BondConfig, BridgeConfig, InterfaceConfig, Result, VlanConfig,
};

use crate::backend::{self, PersistenceBackend, ARTIFACT_PREFIX};

/// Priority prefix: sorts after distribution-installed files so these
/// artifacts apply deterministically relative to them
const FILE_PRIORITY: &str = "90";

/// Persistence for the Ubuntu/Debian netplan ecosystem
pub struct NetplanBackend {
    config_dir: PathBuf,
}

impl NetplanBackend {
    /// Create a netplan backend rooted at `config_dir`, verifying that
    /// the netplan CLI and the directory are present
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        backend::require_command("netplan")?;
        backend::require_dir(&config_dir)?;
        Ok(Self { config_dir })
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.config_dir
            .join(format!("{}-{}-{}.yaml", FILE_PRIORITY, ARTIFACT_PREFIX, name))
    }

    /// Serialize and write a single-device document. Files carry
    /// owner-only permissions: they can reveal internal topology.
    async fn write_network(&self, name: &str, network: NetplanNetwork) -> Result<()> {
        let document = NetplanFile { network };
        let data = serde_yaml::to_string(&document)?;
        backend::write_artifact(&self.artifact_path(name), &data, 0o600).await
    }
}

#[derive(Serialize)]
struct NetplanFile {
    network: NetplanNetwork,
}

#[derive(Serialize)]
struct NetplanNetwork {
    version: u8,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    ethernets: IndexMap<String, NetplanDevice>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    bridges: IndexMap<String, NetplanDevice>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    bonds: IndexMap<String, NetplanDevice>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    vlans: IndexMap<String, NetplanDevice>,
}

impl NetplanNetwork {
    fn new() -> Self {
        Self {
            version: 2,
            ethernets: IndexMap::new(),
            bridges: IndexMap::new(),
            bonds: IndexMap::new(),
            vlans: IndexMap::new(),
        }
    }
}

#[derive(Serialize, Default)]
struct NetplanDevice {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtu: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routes: Vec<NetplanRoute>,
    /// Member interfaces, for bridges and bonds
    #[serde(skip_serializing_if = "Vec::is_empty")]
    interfaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<NetplanParameters>,
    /// VLAN id
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u16>,
    /// VLAN parent link
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

#[derive(Serialize)]
struct NetplanRoute {
    to: String,
    via: String,
}

#[derive(Serialize, Default)]
struct NetplanParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    stp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
}

fn cidr_strings(addresses: &[hostnet_core::AddressConfig]) -> Vec<String> {
    addresses.iter().map(ToString::to_string).collect()
}

#[async_trait]
impl PersistenceBackend for NetplanBackend {
    async fn save_interface(&self, config: &InterfaceConfig) -> Result<()> {
        let device = NetplanDevice {
            addresses: cidr_strings(&config.addresses),
            mtu: config.mtu,
            routes: config
                .gateway
                .map(|gateway| {
                    vec![NetplanRoute {
                        to: "0.0.0.0/0".to_string(),
                        via: gateway.to_string(),
                    }]
                })
                .unwrap_or_default(),
            ..Default::default()
        };

        let mut network = NetplanNetwork::new();
        network.ethernets.insert(config.name.clone(), device);
        self.write_network(&config.name, network).await
    }

    async fn delete_interface(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    async fn save_bridge(&self, config: &BridgeConfig) -> Result<()> {
        let device = NetplanDevice {
            addresses: cidr_strings(&config.addresses),
            interfaces: config.members.clone(),
            parameters: Some(NetplanParameters {
                stp: Some(config.stp),
                mode: None,
            }),
            ..Default::default()
        };

        let mut network = NetplanNetwork::new();
        network.bridges.insert(config.name.clone(), device);
        self.write_network(&config.name, network).await
    }

    async fn delete_bridge(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    async fn save_bond(&self, config: &BondConfig) -> Result<()> {
        let device = NetplanDevice {
            addresses: cidr_strings(&config.addresses),
            interfaces: config.members.clone(),
            parameters: Some(NetplanParameters {
                stp: None,
                mode: Some(config.mode.to_string()),
            }),
            ..Default::default()
        };

        let mut network = NetplanNetwork::new();
        network.bonds.insert(config.name.clone(), device);
        self.write_network(&config.name, network).await
    }

    async fn delete_bond(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    async fn save_vlan(&self, config: &VlanConfig) -> Result<()> {
        let device = NetplanDevice {
            addresses: cidr_strings(&config.addresses),
            id: Some(config.vlan_id),
            link: Some(config.parent.clone()),
            ..Default::default()
        };

        let mut network = NetplanNetwork::new();
        network.vlans.insert(config.name.clone(), device);
        self.write_network(&config.name, network).await
    }

    async fn delete_vlan(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    async fn system_reload(&self) -> Result<()> {
        backend::run_reload("netplan", &["apply"]).await
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Netplan
    }
}
