//! PersistenceBackend contract, factory and shared file helpers

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use hostnet_core::{
    BackendType, BondConfig, BridgeConfig, DetectionError, InterfaceConfig, NetworkError, Result,
    VlanConfig,
};

use crate::ifupdown::IfupdownBackend;
use crate::netplan::NetplanBackend;
use crate::network_manager::NetworkManagerBackend;
use crate::network_scripts::NetworkScriptsBackend;
use crate::noop::NoOpBackend;

/// Default netplan configuration directory
pub const NETPLAN_DIR: &str = "/etc/netplan";
/// Default NetworkManager system connection directory
pub const NETWORK_MANAGER_DIR: &str = "/etc/NetworkManager/system-connections";
/// Default RHEL 7 network-scripts directory
pub const NETWORK_SCRIPTS_DIR: &str = "/etc/sysconfig/network-scripts";
/// Default ifupdown drop-in directory
pub const IFUPDOWN_DIR: &str = "/etc/network/interfaces.d";

/// Filename prefix for artifacts owned by this subsystem, so they stay
/// globbable and distinguishable from operator-managed files
pub(crate) const ARTIFACT_PREFIX: &str = "hostnet";

/// Durable persistence of network configuration into a native
/// configuration ecosystem.
///
/// Save is an upsert: it overwrites, never duplicates, the artifact(s)
/// identified by the entity name. Delete is idempotent and succeeds
/// when the artifact is already absent. Callers that need ordering
/// between calls against the same name must serialize them; two
/// concurrent saves race at the filesystem level (last writer wins).
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Persist interface configuration
    async fn save_interface(&self, config: &InterfaceConfig) -> Result<()>;
    /// Remove interface configuration
    async fn delete_interface(&self, name: &str) -> Result<()>;
    /// Persist bridge configuration
    async fn save_bridge(&self, config: &BridgeConfig) -> Result<()>;
    /// Remove bridge configuration
    async fn delete_bridge(&self, name: &str) -> Result<()>;
    /// Persist bond configuration
    async fn save_bond(&self, config: &BondConfig) -> Result<()>;
    /// Remove bond configuration
    async fn delete_bond(&self, name: &str) -> Result<()>;
    /// Persist VLAN configuration
    async fn save_vlan(&self, config: &VlanConfig) -> Result<()>;
    /// Remove VLAN configuration
    async fn delete_vlan(&self, name: &str) -> Result<()>;
    /// Best-effort application of the persisted state to the running
    /// system. Backends whose native reload would drop active
    /// connections return success without acting.
    async fn system_reload(&self) -> Result<()>;
    /// The native ecosystem this backend writes for
    fn backend_type(&self) -> BackendType;
}

/// Create the persistence backend for a detected ecosystem.
///
/// Prerequisite checks (missing CLI, missing directory, inactive
/// service) run here, once, so callers fail fast at startup instead of
/// on every later Save/Delete call.
pub fn create_backend(backend_type: BackendType) -> Result<Box<dyn PersistenceBackend>> {
    debug!("creating persistence backend: {}", backend_type);

    match backend_type {
        BackendType::Netplan => Ok(Box::new(NetplanBackend::new(NETPLAN_DIR)?)),
        BackendType::NetworkManager => {
            Ok(Box::new(NetworkManagerBackend::new(NETWORK_MANAGER_DIR)?))
        }
        BackendType::NetworkScripts => {
            Ok(Box::new(NetworkScriptsBackend::new(NETWORK_SCRIPTS_DIR)?))
        }
        BackendType::Ifupdown => Ok(Box::new(IfupdownBackend::new(IFUPDOWN_DIR)?)),
        BackendType::None => Ok(Box::new(NoOpBackend)),
    }
}

/// Fail construction when the configuration directory is missing
pub(crate) fn require_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(DetectionError::MissingDirectory {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

/// Fail construction when a required command is not on the search path
pub(crate) fn require_command(command: &str) -> Result<()> {
    which::which(command)
        .map(|_| ())
        .map_err(|_| {
            DetectionError::MissingCommand {
                command: command.to_string(),
            }
            .into()
        })
}

/// Write an artifact, truncating any previous content and enforcing
/// the given permission mode even when the file already existed
pub(crate) async fn write_artifact(path: &Path, contents: &str, mode: u32) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .await
        .map_err(|err| NetworkError::io(path, err))?;

    file.write_all(contents.as_bytes())
        .await
        .map_err(|err| NetworkError::io(path, err))?;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|err| NetworkError::io(path, err))?;

    debug!("wrote {}", path.display());
    Ok(())
}

/// Remove an artifact, treating an already-absent file as success
pub(crate) async fn remove_artifact(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("removed {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(NetworkError::io(path, err)),
    }
}

/// Run a native reload command, surfacing its combined output verbatim
/// on non-zero exit so the caller gets the tool's own diagnostic
pub(crate) async fn run_reload(program: &str, args: &[&str]) -> Result<()> {
    let command = format!("{} {}", program, args.join(" "));
    debug!("running reload command: {}", command);

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|err| NetworkError::Reload {
            command: command.clone(),
            output: err.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Err(NetworkError::Reload {
        command,
        output: combined,
    })
}
