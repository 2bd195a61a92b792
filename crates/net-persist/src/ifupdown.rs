//! ifupdown backend: Debian interfaces(5) stanzas under interfaces.d
//!
//! One drop-in file per entity. The directory must be sourced from
//! /etc/network/interfaces via `source` or `source-directory` for
//! these artifacts to take effect.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use log::info;

use hostnet_core::{
    AddressConfig, BackendType, BondConfig, BridgeConfig, InterfaceConfig, Result, VlanConfig,
};

use crate::backend::{self, PersistenceBackend, ARTIFACT_PREFIX};

const FILE_MODE: u32 = 0o644;

/// Persistence for the Debian ifupdown ecosystem
#[derive(Debug)]
pub struct IfupdownBackend {
    config_dir: PathBuf,
}

impl IfupdownBackend {
    /// Create an ifupdown backend rooted at `config_dir`, verifying
    /// that the directory exists
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        backend::require_dir(&config_dir)?;
        Ok(Self { config_dir })
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.config_dir
            .join(format!("{}-{}.conf", ARTIFACT_PREFIX, name))
    }

    async fn write_stanzas(&self, name: &str, content: &str) -> Result<()> {
        backend::write_artifact(&self.artifact_path(name), content, FILE_MODE).await
    }
}

/// `auto` plus the first `iface` stanza. The method is `static` when
/// addresses exist, otherwise the given fallback; type-specific option
/// lines land in this stanza either way.
fn primary_stanza(
    name: &str,
    addresses: &[AddressConfig],
    fallback_method: &str,
    options: &[String],
) -> String {
    let mut stanza = String::new();
    let _ = writeln!(stanza, "auto {}", name);

    match addresses.first() {
        Some(address) => {
            let _ = writeln!(stanza, "iface {} inet static", name);
            let _ = writeln!(stanza, "    address {}", address.address);
            let _ = writeln!(stanza, "    netmask {}", address.netmask());
        }
        None => {
            let _ = writeln!(stanza, "iface {} inet {}", name, fallback_method);
        }
    }

    for option in options {
        let _ = writeln!(stanza, "    {}", option);
    }

    stanza
}

/// Each secondary address gets its own bare static stanza
fn secondary_stanzas(name: &str, addresses: &[AddressConfig]) -> String {
    let mut stanzas = String::new();

    for address in addresses.iter().skip(1) {
        let _ = writeln!(stanzas);
        let _ = writeln!(stanzas, "iface {} inet static", name);
        let _ = writeln!(stanzas, "    address {}", address.address);
        let _ = writeln!(stanzas, "    netmask {}", address.netmask());
    }

    stanzas
}

#[async_trait]
impl PersistenceBackend for IfupdownBackend {
    async fn save_interface(&self, config: &InterfaceConfig) -> Result<()> {
        let mut options = Vec::new();
        if !config.addresses.is_empty() {
            if let Some(gateway) = config.gateway {
                options.push(format!("gateway {}", gateway));
            }
        }
        if let Some(mtu) = config.mtu {
            options.push(format!("mtu {}", mtu));
        }

        let mut content = primary_stanza(&config.name, &config.addresses, "dhcp", &options);
        content.push_str(&secondary_stanzas(&config.name, &config.addresses));
        self.write_stanzas(&config.name, &content).await
    }

    async fn delete_interface(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    async fn save_bridge(&self, config: &BridgeConfig) -> Result<()> {
        let ports = if config.members.is_empty() {
            "none".to_string()
        } else {
            config.members.join(" ")
        };
        let options = vec![
            format!("bridge_ports {}", ports),
            format!("bridge_stp {}", if config.stp { "on" } else { "off" }),
        ];

        let mut content = primary_stanza(&config.name, &config.addresses, "manual", &options);
        content.push_str(&secondary_stanzas(&config.name, &config.addresses));
        self.write_stanzas(&config.name, &content).await
    }

    async fn delete_bridge(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    async fn save_bond(&self, config: &BondConfig) -> Result<()> {
        let options = vec![
            format!("bond-mode {}", config.mode),
            format!("bond-slaves {}", config.members.join(" ")),
        ];

        let mut content = primary_stanza(&config.name, &config.addresses, "manual", &options);
        content.push_str(&secondary_stanzas(&config.name, &config.addresses));
        self.write_stanzas(&config.name, &content).await
    }

    async fn delete_bond(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    async fn save_vlan(&self, config: &VlanConfig) -> Result<()> {
        let options = vec![format!("vlan-raw-device {}", config.parent)];

        let mut content = primary_stanza(&config.name, &config.addresses, "manual", &options);
        content.push_str(&secondary_stanzas(&config.name, &config.addresses));
        self.write_stanzas(&config.name, &content).await
    }

    async fn delete_vlan(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.artifact_path(name)).await
    }

    /// Persist only: ifupdown has no global reload that preserves
    /// active connections, so activation is left to ifup/ifdown.
    async fn system_reload(&self) -> Result<()> {
        info!("ifupdown backend: persisted only, run ifup/ifdown to apply");
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Ifupdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostnet_core::{BondMode, DetectionError, NetworkError};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_backend() -> (TempDir, IfupdownBackend) {
        let dir = TempDir::new().unwrap();
        let backend = IfupdownBackend {
            config_dir: dir.path().to_path_buf(),
        };
        (dir, backend)
    }

    fn read_artifact(backend: &IfupdownBackend, name: &str) -> String {
        std::fs::read_to_string(backend.artifact_path(name)).unwrap()
    }

    #[tokio::test]
    async fn test_new_fails_fast_on_missing_directory() {
        let err = IfupdownBackend::new("/nonexistent/interfaces.d").unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Detection(DetectionError::MissingDirectory { ref path })
                if path == Path::new("/nonexistent/interfaces.d")
        ));
    }

    #[tokio::test]
    async fn test_static_interface_stanza() {
        let (_dir, backend) = test_backend();
        let config = InterfaceConfig::new("eth0")
            .with_address("10.0.0.5/24".parse().unwrap())
            .with_gateway("10.0.0.1".parse().unwrap())
            .with_mtu(9000);

        backend.save_interface(&config).await.unwrap();

        assert_eq!(
            read_artifact(&backend, "eth0"),
            "auto eth0\n\
             iface eth0 inet static\n\
             \x20   address 10.0.0.5\n\
             \x20   netmask 255.255.255.0\n\
             \x20   gateway 10.0.0.1\n\
             \x20   mtu 9000\n"
        );
    }

    #[tokio::test]
    async fn test_interface_without_addresses_is_dhcp() {
        let (_dir, backend) = test_backend();
        backend
            .save_interface(&InterfaceConfig::new("eth0"))
            .await
            .unwrap();

        let content = read_artifact(&backend, "eth0");
        assert!(content.contains("iface eth0 inet dhcp\n"));
        assert!(!content.contains("address"));
    }

    #[tokio::test]
    async fn test_secondary_addresses_get_their_own_stanzas() {
        let (_dir, backend) = test_backend();
        let config = InterfaceConfig::new("eth0")
            .with_address("10.0.0.5/24".parse().unwrap())
            .with_address("10.0.1.5/16".parse().unwrap());

        backend.save_interface(&config).await.unwrap();

        let content = read_artifact(&backend, "eth0");
        assert_eq!(content.matches("iface eth0 inet static").count(), 2);
        assert!(content.contains("    address 10.0.1.5\n    netmask 255.255.0.0\n"));
    }

    #[tokio::test]
    async fn test_bridge_stanza() {
        let (_dir, backend) = test_backend();
        let config = BridgeConfig::new("br0")
            .with_member("eth0")
            .with_member("eth1")
            .with_stp(true)
            .with_address("192.168.1.1/24".parse().unwrap());

        backend.save_bridge(&config).await.unwrap();

        let content = read_artifact(&backend, "br0");
        assert!(content.contains("auto br0\n"));
        assert!(content.contains("iface br0 inet static\n"));
        assert!(content.contains("    bridge_ports eth0 eth1\n"));
        assert!(content.contains("    bridge_stp on\n"));
    }

    #[tokio::test]
    async fn test_bond_without_addresses_is_manual_with_mode() {
        let (_dir, backend) = test_backend();
        let config = BondConfig::new("bond0", BondMode::ActiveBackup)
            .with_member("eth0")
            .with_member("eth1");

        backend.save_bond(&config).await.unwrap();

        let content = read_artifact(&backend, "bond0");
        assert!(content.contains("iface bond0 inet manual\n"));
        assert!(content.contains("    bond-mode active-backup\n"));
        assert!(content.contains("    bond-slaves eth0 eth1\n"));
    }

    #[tokio::test]
    async fn test_vlan_raw_device() {
        let (_dir, backend) = test_backend();
        let config = VlanConfig::new("vlan100", "eth0", 100)
            .unwrap()
            .with_address("172.16.0.1/24".parse().unwrap());

        backend.save_vlan(&config).await.unwrap();

        let content = read_artifact(&backend, "vlan100");
        assert!(content.contains("    vlan-raw-device eth0\n"));
    }

    #[tokio::test]
    async fn test_save_delete_restores_directory() {
        let (dir, backend) = test_backend();
        let config = InterfaceConfig::new("eth0").with_address("10.0.0.5/24".parse().unwrap());

        backend.save_interface(&config).await.unwrap();
        assert!(backend.artifact_path("eth0").exists());

        backend.delete_interface("eth0").await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        backend.delete_interface("eth0").await.unwrap();
    }

    #[tokio::test]
    async fn test_artifact_permissions_are_world_readable() {
        let (_dir, backend) = test_backend();
        backend
            .save_interface(&InterfaceConfig::new("eth0"))
            .await
            .unwrap();

        let metadata = std::fs::metadata(backend.artifact_path("eth0")).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o644);
    }
}
