//! network-scripts backend: legacy RHEL 7 ifcfg shell-variable files
//!
//! Member interfaces are expressed in their own `ifcfg-<member>` files
//! that point back at the primary with `BRIDGE=` or `MASTER=`, so
//! cleanup has to scan file contents rather than filenames.

use std::path::PathBuf;

use async_trait::async_trait;
use log::{info, warn};

use hostnet_core::{
    AddressConfig, BackendType, BondConfig, BridgeConfig, InterfaceConfig, NetworkError, Result,
    VlanConfig,
};

use crate::backend::{self, PersistenceBackend};

const FILE_PREFIX: &str = "ifcfg-";

/// ifcfg files are world-readable by convention on EL hosts
const FILE_MODE: u32 = 0o644;

/// Persistence for the RHEL 7/CentOS 7 network-scripts ecosystem
#[derive(Debug)]
pub struct NetworkScriptsBackend {
    config_dir: PathBuf,
}

impl NetworkScriptsBackend {
    /// Create a network-scripts backend rooted at `config_dir`,
    /// verifying that the directory exists
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        backend::require_dir(&config_dir)?;
        Ok(Self { config_dir })
    }

    fn ifcfg_path(&self, name: &str) -> PathBuf {
        self.config_dir.join(format!("{}{}", FILE_PREFIX, name))
    }

    async fn write_ifcfg(&self, name: &str, content: &str) -> Result<()> {
        backend::write_artifact(&self.ifcfg_path(name), content, FILE_MODE).await
    }

    /// Write one `ifcfg-<member>` file per member, enslaved via the
    /// given `BRIDGE=` or `MASTER=` key
    async fn write_member_files(
        &self,
        members: &[String],
        enslave_lines: &[String],
    ) -> Result<()> {
        for member in members {
            let mut content = String::new();
            content.push_str(&format!("DEVICE={}\n", member));
            content.push_str("TYPE=Ethernet\n");
            for line in enslave_lines {
                content.push_str(line);
                content.push('\n');
            }
            content.push_str("ONBOOT=yes\n");

            self.write_ifcfg(member, &content).await?;
        }
        Ok(())
    }

    /// Remove every `ifcfg-*` file containing one of the given lines.
    /// Matching is whole-line equality on trimmed lines, never
    /// substring, so `BRIDGE=br0` does not claim members of `br0x`.
    async fn sweep_member_files(&self, marker_lines: &[String]) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.config_dir)
            .await
            .map_err(|err| NetworkError::io(&self.config_dir, err))?;

        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|err| NetworkError::io(&self.config_dir, err))?;
            let Some(entry) = entry else { break };

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.starts_with(FILE_PREFIX) {
                continue;
            }

            let content = match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => content,
                Err(err) => {
                    warn!("failed to read {}: {}", entry.path().display(), err);
                    continue;
                }
            };

            let enslaved = content
                .lines()
                .any(|line| marker_lines.iter().any(|marker| line.trim() == marker));
            if enslaved {
                if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                    warn!(
                        "failed to remove member file {}: {}",
                        entry.path().display(),
                        err
                    );
                }
            }
        }

        Ok(())
    }
}

/// `BOOTPROTO=` plus `IPADDR`/`NETMASK` pairs; the first address uses
/// bare keys, the rest are numbered
fn push_addressing(content: &mut String, addresses: &[AddressConfig], fallback_proto: &str) {
    if addresses.is_empty() {
        content.push_str(&format!("BOOTPROTO={}\n", fallback_proto));
        return;
    }

    content.push_str("BOOTPROTO=static\n");
    for (index, address) in addresses.iter().enumerate() {
        let suffix = if index == 0 {
            String::new()
        } else {
            index.to_string()
        };
        content.push_str(&format!("IPADDR{}={}\n", suffix, address.address));
        content.push_str(&format!("NETMASK{}={}\n", suffix, address.netmask()));
    }
}

#[async_trait]
impl PersistenceBackend for NetworkScriptsBackend {
    async fn save_interface(&self, config: &InterfaceConfig) -> Result<()> {
        let mut content = String::new();
        content.push_str(&format!("DEVICE={}\n", config.name));
        content.push_str("TYPE=Ethernet\n");
        push_addressing(&mut content, &config.addresses, "dhcp");
        if let Some(gateway) = config.gateway {
            content.push_str(&format!("GATEWAY={}\n", gateway));
        }
        if let Some(mtu) = config.mtu {
            content.push_str(&format!("MTU={}\n", mtu));
        }
        content.push_str("ONBOOT=yes\n");

        self.write_ifcfg(&config.name, &content).await
    }

    async fn delete_interface(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.ifcfg_path(name)).await
    }

    async fn save_bridge(&self, config: &BridgeConfig) -> Result<()> {
        let mut content = String::new();
        content.push_str(&format!("DEVICE={}\n", config.name));
        content.push_str("TYPE=Bridge\n");
        push_addressing(&mut content, &config.addresses, "none");
        content.push_str(&format!(
            "STP={}\n",
            if config.stp { "on" } else { "off" }
        ));
        content.push_str("ONBOOT=yes\n");

        let marker = vec![format!("BRIDGE={}", config.name)];
        self.sweep_member_files(&marker).await?;
        self.write_ifcfg(&config.name, &content).await?;
        self.write_member_files(&config.members, &marker).await
    }

    async fn delete_bridge(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.ifcfg_path(name)).await?;
        self.sweep_member_files(&[format!("BRIDGE={}", name)]).await
    }

    async fn save_bond(&self, config: &BondConfig) -> Result<()> {
        let mut content = String::new();
        content.push_str(&format!("DEVICE={}\n", config.name));
        content.push_str("TYPE=Bond\n");
        content.push_str("BONDING_MASTER=yes\n");
        content.push_str(&format!("BONDING_OPTS=\"mode={}\"\n", config.mode));
        push_addressing(&mut content, &config.addresses, "none");
        content.push_str("ONBOOT=yes\n");

        let markers = vec![format!("MASTER={}", config.name), "SLAVE=yes".to_string()];
        // Sweep keys on MASTER= only; SLAVE=yes alone would claim
        // members of every bond
        self.sweep_member_files(&markers[..1]).await?;
        self.write_ifcfg(&config.name, &content).await?;
        self.write_member_files(&config.members, &markers).await
    }

    async fn delete_bond(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.ifcfg_path(name)).await?;
        self.sweep_member_files(&[format!("MASTER={}", name)]).await
    }

    async fn save_vlan(&self, config: &VlanConfig) -> Result<()> {
        let mut content = String::new();
        content.push_str(&format!("DEVICE={}\n", config.name));
        content.push_str("VLAN=yes\n");
        content.push_str(&format!("PHYSDEV={}\n", config.parent));
        push_addressing(&mut content, &config.addresses, "none");
        content.push_str("ONBOOT=yes\n");

        self.write_ifcfg(&config.name, &content).await
    }

    async fn delete_vlan(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.ifcfg_path(name)).await
    }

    /// Intentionally does not restart the network service: that drops
    /// active connections. An operator must request activation.
    async fn system_reload(&self) -> Result<()> {
        info!("network-scripts backend: persisted only, manual service restart required");
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::NetworkScripts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostnet_core::{BondMode, DetectionError};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_backend() -> (TempDir, NetworkScriptsBackend) {
        let dir = TempDir::new().unwrap();
        let backend = NetworkScriptsBackend {
            config_dir: dir.path().to_path_buf(),
        };
        (dir, backend)
    }

    fn read_ifcfg(backend: &NetworkScriptsBackend, name: &str) -> String {
        std::fs::read_to_string(backend.ifcfg_path(name)).unwrap()
    }

    fn file_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_new_fails_fast_on_missing_directory() {
        let err = NetworkScriptsBackend::new("/nonexistent/network-scripts").unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Detection(DetectionError::MissingDirectory { ref path })
                if path == Path::new("/nonexistent/network-scripts")
        ));
    }

    #[tokio::test]
    async fn test_delete_surfaces_member_scan_failure() {
        // Primary removal tolerates an absent file, but the member
        // sweep cannot scan a missing directory
        let backend = NetworkScriptsBackend {
            config_dir: PathBuf::from("/nonexistent/network-scripts"),
        };

        let err = backend.delete_bridge("br0").await.unwrap_err();
        assert!(matches!(err, NetworkError::Io { .. }));

        let err = backend.delete_bond("bond0").await.unwrap_err();
        assert!(matches!(err, NetworkError::Io { .. }));
    }

    #[tokio::test]
    async fn test_static_interface_exact_content() {
        let (_dir, backend) = test_backend();
        let config = InterfaceConfig::new("eth0")
            .with_address("10.0.0.5/24".parse().unwrap())
            .with_gateway("10.0.0.1".parse().unwrap());

        backend.save_interface(&config).await.unwrap();

        assert_eq!(
            read_ifcfg(&backend, "eth0"),
            "DEVICE=eth0\n\
             TYPE=Ethernet\n\
             BOOTPROTO=static\n\
             IPADDR=10.0.0.5\n\
             NETMASK=255.255.255.0\n\
             GATEWAY=10.0.0.1\n\
             ONBOOT=yes\n"
        );
    }

    #[tokio::test]
    async fn test_interface_without_addresses_uses_dhcp() {
        let (_dir, backend) = test_backend();
        backend
            .save_interface(&InterfaceConfig::new("eth0"))
            .await
            .unwrap();

        let content = read_ifcfg(&backend, "eth0");
        assert!(content.contains("BOOTPROTO=dhcp\n"));
        assert!(!content.contains("IPADDR"));
    }

    #[tokio::test]
    async fn test_secondary_addresses_are_numbered() {
        let (_dir, backend) = test_backend();
        let config = InterfaceConfig::new("eth0")
            .with_address("10.0.0.5/24".parse().unwrap())
            .with_address("10.0.1.5/16".parse().unwrap());

        backend.save_interface(&config).await.unwrap();

        let content = read_ifcfg(&backend, "eth0");
        assert!(content.contains("IPADDR=10.0.0.5\n"));
        assert!(content.contains("NETMASK=255.255.255.0\n"));
        assert!(content.contains("IPADDR1=10.0.1.5\n"));
        assert!(content.contains("NETMASK1=255.255.0.0\n"));
    }

    #[tokio::test]
    async fn test_bridge_writes_member_files() {
        let (dir, backend) = test_backend();
        let config = BridgeConfig::new("br0")
            .with_member("eth0")
            .with_member("eth1")
            .with_stp(true)
            .with_address("192.168.1.1/24".parse().unwrap());

        backend.save_bridge(&config).await.unwrap();
        assert_eq!(file_count(&dir), 3);

        let primary = read_ifcfg(&backend, "br0");
        assert!(primary.contains("TYPE=Bridge\n"));
        assert!(primary.contains("STP=on\n"));

        let member = read_ifcfg(&backend, "eth0");
        assert!(member.contains("BRIDGE=br0\n"));
        assert!(member.contains("TYPE=Ethernet\n"));
    }

    #[tokio::test]
    async fn test_bond_master_and_slave_keys() {
        let (dir, backend) = test_backend();
        let config = BondConfig::new("bond0", BondMode::Ieee8023ad)
            .with_member("eth0")
            .with_member("eth1");

        backend.save_bond(&config).await.unwrap();
        assert_eq!(file_count(&dir), 3);

        let primary = read_ifcfg(&backend, "bond0");
        assert!(primary.contains("BONDING_MASTER=yes\n"));
        assert!(primary.contains("BONDING_OPTS=\"mode=802.3ad\"\n"));
        assert!(primary.contains("BOOTPROTO=none\n"));

        let member = read_ifcfg(&backend, "eth1");
        assert!(member.contains("MASTER=bond0\n"));
        assert!(member.contains("SLAVE=yes\n"));
    }

    #[tokio::test]
    async fn test_delete_bridge_removes_member_files() {
        let (dir, backend) = test_backend();
        let config = BridgeConfig::new("br0")
            .with_member("eth0")
            .with_member("eth1");

        backend.save_bridge(&config).await.unwrap();
        backend.delete_bridge("br0").await.unwrap();
        assert_eq!(file_count(&dir), 0);

        backend.delete_bridge("br0").await.unwrap();
    }

    #[tokio::test]
    async fn test_member_cleanup_matches_whole_lines_only() {
        let (dir, backend) = test_backend();
        let short = BridgeConfig::new("br0").with_member("eth0");
        let long = BridgeConfig::new("br0x").with_member("eth1");

        backend.save_bridge(&short).await.unwrap();
        backend.save_bridge(&long).await.unwrap();
        assert_eq!(file_count(&dir), 4);

        backend.delete_bridge("br0").await.unwrap();
        assert_eq!(file_count(&dir), 2);
        assert!(backend.ifcfg_path("br0x").exists());
        assert!(read_ifcfg(&backend, "eth1").contains("BRIDGE=br0x\n"));
    }

    #[tokio::test]
    async fn test_save_sweeps_members_dropped_from_config() {
        let (dir, backend) = test_backend();
        let wide = BridgeConfig::new("br0")
            .with_member("eth0")
            .with_member("eth1");
        let narrow = BridgeConfig::new("br0").with_member("eth0");

        backend.save_bridge(&wide).await.unwrap();
        backend.save_bridge(&narrow).await.unwrap();

        assert_eq!(file_count(&dir), 2);
        assert!(!backend.ifcfg_path("eth1").exists());
    }

    #[tokio::test]
    async fn test_vlan_physdev() {
        let (_dir, backend) = test_backend();
        let config = VlanConfig::new("eth0.100", "eth0", 100)
            .unwrap()
            .with_address("172.16.0.1/24".parse().unwrap());

        backend.save_vlan(&config).await.unwrap();

        let content = read_ifcfg(&backend, "eth0.100");
        assert!(content.contains("VLAN=yes\n"));
        assert!(content.contains("PHYSDEV=eth0\n"));
        assert!(content.contains("BOOTPROTO=static\n"));
    }

    #[tokio::test]
    async fn test_reload_is_a_noop() {
        let (_dir, backend) = test_backend();
        backend.system_reload().await.unwrap();
    }

    #[tokio::test]
    async fn test_artifact_permissions_are_world_readable() {
        let (_dir, backend) = test_backend();
        backend
            .save_interface(&InterfaceConfig::new("eth0"))
            .await
            .unwrap();

        let metadata = std::fs::metadata(backend.ifcfg_path("eth0")).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o644);
    }
}
