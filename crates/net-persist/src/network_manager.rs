//! NetworkManager backend: one key file per connection profile
//!
//! Enslavement is a relationship between independently-named
//! connection profiles, not an inline list: saving a bridge or bond
//! with N members writes N+1 files.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use async_trait::async_trait;
use log::warn;
use uuid::Uuid;

use hostnet_core::{
    AddressConfig, BackendType, BondConfig, BridgeConfig, DetectionError, InterfaceConfig,
    NetworkError, Result, VlanConfig,
};

use crate::backend::{self, PersistenceBackend, ARTIFACT_PREFIX};
use crate::detect::{HostProbe, SystemProbe};

const FILE_SUFFIX: &str = ".nmconnection";

/// How a member profile is enslaved to its primary
#[derive(Debug, Clone, Copy)]
enum SlaveType {
    Bridge,
    Bond,
}

impl SlaveType {
    /// Value of the keyfile `slave-type` key
    fn keyword(self) -> &'static str {
        match self {
            SlaveType::Bridge => "bridge",
            SlaveType::Bond => "bond",
        }
    }

    /// Filename infix of member profiles for this enslavement kind
    fn infix(self) -> &'static str {
        match self {
            SlaveType::Bridge => "port",
            SlaveType::Bond => "slave",
        }
    }
}

/// Persistence for the RHEL 8+/Rocky/AlmaLinux/Fedora NetworkManager
/// ecosystem
pub struct NetworkManagerBackend {
    config_dir: PathBuf,
}

impl NetworkManagerBackend {
    /// Create a NetworkManager backend rooted at `config_dir`,
    /// verifying that the service is active and the directory exists
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        if !SystemProbe.service_active("NetworkManager") {
            return Err(DetectionError::ServiceInactive {
                service: "NetworkManager".to_string(),
            }
            .into());
        }
        backend::require_dir(&config_dir)?;
        Ok(Self { config_dir })
    }

    /// Stable connection id derived from the entity name
    fn connection_id(name: &str) -> String {
        format!("{}-{}", ARTIFACT_PREFIX, name)
    }

    fn primary_path(&self, name: &str) -> PathBuf {
        self.config_dir
            .join(format!("{}{}", Self::connection_id(name), FILE_SUFFIX))
    }

    /// Filename prefix shared by every member profile of one primary.
    /// The full primary name plus infix is part of the prefix, so a
    /// primary whose name is a prefix of another entity's name never
    /// matches the other's member profiles.
    fn member_prefix(name: &str, slave_type: SlaveType) -> String {
        format!(
            "{}-{}-{}-",
            ARTIFACT_PREFIX,
            name,
            slave_type.infix()
        )
    }

    fn member_path(&self, name: &str, slave_type: SlaveType, member: &str) -> PathBuf {
        self.config_dir.join(format!(
            "{}{}{}",
            Self::member_prefix(name, slave_type),
            member,
            FILE_SUFFIX
        ))
    }

    /// NetworkManager documents owner-only permissions for keyfiles
    async fn write_keyfile(&self, path: &PathBuf, content: &str) -> Result<()> {
        backend::write_artifact(path, content, 0o600).await
    }

    /// Write one enslaved ethernet profile per member interface
    async fn write_member_profiles(
        &self,
        name: &str,
        slave_type: SlaveType,
        members: &[String],
        autoconnect: bool,
    ) -> Result<()> {
        let master = Self::connection_id(name);

        for member in members {
            let path = self.member_path(name, slave_type, member);
            let id = format!("{}-{}-{}", master, slave_type.infix(), member);

            let mut keyfile = String::new();
            keyfile.push_str("[connection]\n");
            keyfile.push_str(&format!("id={}\n", id));
            keyfile.push_str(&format!("uuid={}\n", Uuid::new_v4()));
            keyfile.push_str("type=ethernet\n");
            keyfile.push_str(&format!("interface-name={}\n", member));
            keyfile.push_str(&format!("master={}\n", master));
            keyfile.push_str(&format!("slave-type={}\n", slave_type.keyword()));
            keyfile.push_str(&format!("autoconnect={}\n", autoconnect));

            self.write_keyfile(&path, &keyfile).await?;
        }

        Ok(())
    }

    /// Remove every member profile belonging to exactly this primary.
    /// Individual removal failures are logged and swallowed so one bad
    /// file does not block the rest; a directory-read failure is
    /// surfaced.
    async fn sweep_member_profiles(&self, name: &str, slave_type: SlaveType) -> Result<()> {
        let prefix = Self::member_prefix(name, slave_type);

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
            if file_name.starts_with(&prefix) && file_name.ends_with(FILE_SUFFIX) {
                if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                    warn!(
                        "failed to remove member profile {}: {}",
                        entry.path().display(),
                        err
                    );
                }
            }
        }

        Ok(())
    }
}

fn push_connection_section(
    keyfile: &mut String,
    id: &str,
    connection_type: &str,
    interface_name: &str,
    autoconnect: bool,
) {
    keyfile.push_str("[connection]\n");
    keyfile.push_str(&format!("id={}\n", id));
    keyfile.push_str(&format!("uuid={}\n", Uuid::new_v4()));
    keyfile.push_str(&format!("type={}\n", connection_type));
    keyfile.push_str(&format!("interface-name={}\n", interface_name));
    keyfile.push_str(&format!("autoconnect={}\n", autoconnect));
    keyfile.push('\n');
}

fn push_ip_sections(keyfile: &mut String, addresses: &[AddressConfig], gateway: Option<Ipv4Addr>) {
    keyfile.push_str("[ipv4]\n");
    if addresses.is_empty() {
        keyfile.push_str("method=auto\n");
    } else {
        keyfile.push_str("method=manual\n");
        for (index, address) in addresses.iter().enumerate() {
            keyfile.push_str(&format!("address{}={}\n", index + 1, address));
        }
        if let Some(gateway) = gateway {
            keyfile.push_str(&format!("gateway={}\n", gateway));
        }
    }
    keyfile.push('\n');

    keyfile.push_str("[ipv6]\n");
    keyfile.push_str("method=auto\n");
}

#[async_trait]
impl PersistenceBackend for NetworkManagerBackend {
    async fn save_interface(&self, config: &InterfaceConfig) -> Result<()> {
        let id = Self::connection_id(&config.name);
        let mut keyfile = String::new();

        push_connection_section(&mut keyfile, &id, "ethernet", &config.name, config.auto_start);

        keyfile.push_str("[ethernet]\n");
        if let Some(mtu) = config.mtu {
            keyfile.push_str(&format!("mtu={}\n", mtu));
        }
        keyfile.push('\n');

        push_ip_sections(&mut keyfile, &config.addresses, config.gateway);

        self.write_keyfile(&self.primary_path(&config.name), &keyfile)
            .await
    }

    async fn delete_interface(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.primary_path(name)).await
    }

    async fn save_bridge(&self, config: &BridgeConfig) -> Result<()> {
        let id = Self::connection_id(&config.name);
        let mut keyfile = String::new();

        push_connection_section(&mut keyfile, &id, "bridge", &config.name, config.auto_start);

        keyfile.push_str("[bridge]\n");
        keyfile.push_str(&format!("stp={}\n", config.stp));
        keyfile.push('\n');

        push_ip_sections(&mut keyfile, &config.addresses, None);

        // Upsert: drop member profiles from a previous save before
        // writing the current member set
        self.sweep_member_profiles(&config.name, SlaveType::Bridge)
            .await?;
        self.write_keyfile(&self.primary_path(&config.name), &keyfile)
            .await?;
        self.write_member_profiles(
            &config.name,
            SlaveType::Bridge,
            &config.members,
            config.auto_start,
        )
        .await
    }

    async fn delete_bridge(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.primary_path(name)).await?;
        self.sweep_member_profiles(name, SlaveType::Bridge).await
    }

    async fn save_bond(&self, config: &BondConfig) -> Result<()> {
        let id = Self::connection_id(&config.name);
        let mut keyfile = String::new();

        push_connection_section(&mut keyfile, &id, "bond", &config.name, config.auto_start);

        keyfile.push_str("[bond]\n");
        keyfile.push_str(&format!("mode={}\n", config.mode));
        keyfile.push('\n');

        push_ip_sections(&mut keyfile, &config.addresses, None);

        self.sweep_member_profiles(&config.name, SlaveType::Bond)
            .await?;
        self.write_keyfile(&self.primary_path(&config.name), &keyfile)
            .await?;
        self.write_member_profiles(
            &config.name,
            SlaveType::Bond,
            &config.members,
            config.auto_start,
        )
        .await
    }

    async fn delete_bond(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.primary_path(name)).await?;
        self.sweep_member_profiles(name, SlaveType::Bond).await
    }

    async fn save_vlan(&self, config: &VlanConfig) -> Result<()> {
        let id = Self::connection_id(&config.name);
        let mut keyfile = String::new();

        push_connection_section(&mut keyfile, &id, "vlan", &config.name, config.auto_start);

        keyfile.push_str("[vlan]\n");
        keyfile.push_str(&format!("parent={}\n", config.parent));
        keyfile.push_str(&format!("id={}\n", config.vlan_id));
        keyfile.push('\n');

        push_ip_sections(&mut keyfile, &config.addresses, None);

        self.write_keyfile(&self.primary_path(&config.name), &keyfile)
            .await
    }

    async fn delete_vlan(&self, name: &str) -> Result<()> {
        backend::remove_artifact(&self.primary_path(name)).await
    }

    async fn system_reload(&self) -> Result<()> {
        backend::run_reload("nmcli", &["connection", "reload"]).await
    }

    fn backend_type(&self) -> BackendType {
        BackendType::NetworkManager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostnet_core::BondMode;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn test_backend() -> (TempDir, NetworkManagerBackend) {
        let dir = TempDir::new().unwrap();
        let backend = NetworkManagerBackend {
            config_dir: dir.path().to_path_buf(),
        };
        (dir, backend)
    }

    fn file_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    fn read_file(backend: &NetworkManagerBackend, file_name: &str) -> String {
        std::fs::read_to_string(backend.config_dir.join(file_name)).unwrap()
    }

    #[tokio::test]
    async fn test_interface_keyfile_sections() {
        let (_dir, backend) = test_backend();
        let config = InterfaceConfig::new("eth0")
            .with_address("10.0.0.5/24".parse().unwrap())
            .with_address("10.0.1.5/24".parse().unwrap())
            .with_gateway("10.0.0.1".parse().unwrap());

        backend.save_interface(&config).await.unwrap();

        let content = read_file(&backend, "hostnet-eth0.nmconnection");
        assert!(content.contains("[connection]\nid=hostnet-eth0\n"));
        assert!(content.contains("type=ethernet\n"));
        assert!(content.contains("interface-name=eth0\n"));
        assert!(content.contains("autoconnect=true\n"));
        assert!(content.contains("method=manual\n"));
        assert!(content.contains("address1=10.0.0.5/24\n"));
        assert!(content.contains("address2=10.0.1.5/24\n"));
        assert!(content.contains("gateway=10.0.0.1\n"));
        assert!(content.contains("[ipv6]\nmethod=auto\n"));
    }

    #[tokio::test]
    async fn test_interface_without_addresses_uses_auto() {
        let (_dir, backend) = test_backend();
        let config = InterfaceConfig::new("eth0");

        backend.save_interface(&config).await.unwrap();

        let content = read_file(&backend, "hostnet-eth0.nmconnection");
        assert!(content.contains("[ipv4]\nmethod=auto\n"));
        assert!(!content.contains("address1"));
    }

    #[tokio::test]
    async fn test_bridge_writes_primary_plus_member_profiles() {
        let (dir, backend) = test_backend();
        let config = BridgeConfig::new("br0")
            .with_member("eth0")
            .with_member("eth1")
            .with_stp(true);

        backend.save_bridge(&config).await.unwrap();
        assert_eq!(file_count(&dir), 3);

        let primary = read_file(&backend, "hostnet-br0.nmconnection");
        assert!(primary.contains("type=bridge\n"));
        assert!(primary.contains("[bridge]\nstp=true\n"));

        let port = read_file(&backend, "hostnet-br0-port-eth0.nmconnection");
        assert!(port.contains("master=hostnet-br0\n"));
        assert!(port.contains("slave-type=bridge\n"));
        assert!(port.contains("interface-name=eth0\n"));
    }

    #[tokio::test]
    async fn test_bond_writes_primary_plus_slave_profiles() {
        let (dir, backend) = test_backend();
        let config = BondConfig::new("bond0", BondMode::ActiveBackup)
            .with_member("eth0")
            .with_member("eth1");

        backend.save_bond(&config).await.unwrap();
        assert_eq!(file_count(&dir), 3);

        let primary = read_file(&backend, "hostnet-bond0.nmconnection");
        assert!(primary.contains("[bond]\nmode=active-backup\n"));

        let slave = read_file(&backend, "hostnet-bond0-slave-eth1.nmconnection");
        assert!(slave.contains("master=hostnet-bond0\n"));
        assert!(slave.contains("slave-type=bond\n"));
    }

    #[tokio::test]
    async fn test_delete_bridge_removes_all_member_profiles() {
        let (dir, backend) = test_backend();
        let config = BridgeConfig::new("br0")
            .with_member("eth0")
            .with_member("eth1");

        backend.save_bridge(&config).await.unwrap();
        backend.delete_bridge("br0").await.unwrap();
        assert_eq!(file_count(&dir), 0);

        // Idempotent second delete
        backend.delete_bridge("br0").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_matches_primary_exactly_not_by_substring() {
        let (dir, backend) = test_backend();
        let short = BridgeConfig::new("br0").with_member("eth0");
        let long = BridgeConfig::new("br0x").with_member("eth1");

        backend.save_bridge(&short).await.unwrap();
        backend.save_bridge(&long).await.unwrap();
        assert_eq!(file_count(&dir), 4);

        backend.delete_bridge("br0").await.unwrap();
        assert_eq!(file_count(&dir), 2);
        assert!(backend.config_dir.join("hostnet-br0x.nmconnection").exists());
        assert!(backend
            .config_dir
            .join("hostnet-br0x-port-eth1.nmconnection")
            .exists());
    }

    #[tokio::test]
    async fn test_save_bridge_sweeps_stale_member_profiles() {
        let (dir, backend) = test_backend();
        let wide = BridgeConfig::new("br0")
            .with_member("eth0")
            .with_member("eth1");
        let narrow = BridgeConfig::new("br0").with_member("eth0");

        backend.save_bridge(&wide).await.unwrap();
        backend.save_bridge(&narrow).await.unwrap();

        assert_eq!(file_count(&dir), 2);
        assert!(!backend
            .config_dir
            .join("hostnet-br0-port-eth1.nmconnection")
            .exists());
    }

    #[tokio::test]
    async fn test_delete_surfaces_member_scan_failure() {
        // Primary removal tolerates an absent file, but the member
        // sweep cannot scan a missing directory
        let backend = NetworkManagerBackend {
            config_dir: PathBuf::from("/nonexistent/system-connections"),
        };

        let err = backend.delete_bridge("br0").await.unwrap_err();
        assert!(matches!(err, NetworkError::Io { .. }));

        let err = backend.delete_bond("bond0").await.unwrap_err();
        assert!(matches!(err, NetworkError::Io { .. }));
    }

    #[tokio::test]
    async fn test_vlan_keyfile() {
        let (_dir, backend) = test_backend();
        let config = VlanConfig::new("vlan100", "eth0", 100)
            .unwrap()
            .with_address("172.16.0.1/24".parse().unwrap());

        backend.save_vlan(&config).await.unwrap();

        let content = read_file(&backend, "hostnet-vlan100.nmconnection");
        assert!(content.contains("type=vlan\n"));
        assert!(content.contains("[vlan]\nparent=eth0\nid=100\n"));
    }

    #[tokio::test]
    async fn test_keyfile_permissions_are_owner_only() {
        let (_dir, backend) = test_backend();
        backend
            .save_interface(&InterfaceConfig::new("eth0"))
            .await
            .unwrap();

        let metadata =
            std::fs::metadata(backend.config_dir.join("hostnet-eth0.nmconnection")).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}
