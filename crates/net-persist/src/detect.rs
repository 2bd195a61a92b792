//! Automatic detection of the native network configuration ecosystem

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use log::debug;

use hostnet_core::BackendType;

use crate::backend::{NETPLAN_DIR, NETWORK_SCRIPTS_DIR};

/// Debian-style interfaces file marking an ifupdown host
const INTERFACES_FILE: &str = "/etc/network/interfaces";

/// Service unit queried for key-file ecosystem activity
const NETWORK_MANAGER_SERVICE: &str = "NetworkManager";

/// Read-only host probes used by detection.
///
/// Parameterized so the priority decision table can be unit tested
/// without a real host underneath.
#[cfg_attr(test, mockall::automock)]
pub trait HostProbe {
    /// Whether a filesystem path exists
    fn path_exists(&self, path: &Path) -> bool;
    /// Whether a command resolves on the search path
    fn command_exists(&self, command: &str) -> bool;
    /// Whether the service manager reports a unit as active
    fn service_active(&self, service: &str) -> bool;
}

/// Probes backed by the real host
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn command_exists(&self, command: &str) -> bool {
        which::which(command).is_ok()
    }

    fn service_active(&self, service: &str) -> bool {
        // Also covers hosts without systemd: a missing systemctl
        // binary reports the service as inactive.
        Command::new("systemctl")
            .arg("is-active")
            .arg(service)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

/// Detect the network configuration ecosystem this host honors at boot
pub fn detect_network_backend() -> BackendType {
    let os_release = read_os_release();
    let backend = select_backend(&os_release, &SystemProbe);
    debug!("detected network backend: {}", backend);
    backend
}

/// Priority-ordered decision table; the first match wins.
///
/// A host can carry leftover directories from a previous OS
/// generation, so the modern tooling that will actually be honored at
/// boot is checked before stale legacy artifacts.
pub fn select_backend(os_release: &HashMap<String, String>, probe: &dyn HostProbe) -> BackendType {
    if is_el8_or_newer(os_release) && probe.service_active(NETWORK_MANAGER_SERVICE) {
        return BackendType::NetworkManager;
    }

    if is_el7(os_release) && probe.path_exists(Path::new(NETWORK_SCRIPTS_DIR)) {
        return BackendType::NetworkScripts;
    }

    if probe.path_exists(Path::new(NETPLAN_DIR)) && probe.command_exists("netplan") {
        return BackendType::Netplan;
    }

    if probe.path_exists(Path::new(INTERFACES_FILE)) {
        return BackendType::Ifupdown;
    }

    BackendType::None
}

/// Read and parse os-release, tolerating a missing file
pub fn read_os_release() -> HashMap<String, String> {
    let content = std::fs::read_to_string("/etc/os-release")
        .or_else(|_| std::fs::read_to_string("/usr/lib/os-release"))
        .unwrap_or_default();
    parse_os_release(&content)
}

fn parse_os_release(content: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            result.insert(key.to_string(), value.trim_matches('"').to_string());
        }
    }

    result
}

/// Rocky, AlmaLinux, or an EL/Fedora-family release with major >= 8
fn is_el8_or_newer(os_release: &HashMap<String, String>) -> bool {
    let id = os_id(os_release);

    // Rocky and AlmaLinux only exist as EL 8+ rebuilds
    if id == "rocky" || id == "almalinux" {
        return true;
    }

    if is_el_family(os_release, &["rhel", "centos", "fedora"]) {
        return matches!(major_version(os_release), Some(major) if major >= 8);
    }

    false
}

/// RHEL 7 or CentOS 7
fn is_el7(os_release: &HashMap<String, String>) -> bool {
    is_el_family(os_release, &["rhel", "centos"]) && major_version(os_release) == Some(7)
}

fn is_el_family(os_release: &HashMap<String, String>, families: &[&str]) -> bool {
    let id = os_id(os_release);
    let id_like = os_release
        .get("ID_LIKE")
        .map(|value| value.to_lowercase())
        .unwrap_or_default();

    families
        .iter()
        .any(|family| id == *family || id_like.contains(family))
}

fn os_id(os_release: &HashMap<String, String>) -> String {
    os_release
        .get("ID")
        .map(|value| value.to_lowercase())
        .unwrap_or_default()
}

/// Leading integer of the dotted VERSION_ID; parse failure means the
/// version test is not satisfied
fn major_version(os_release: &HashMap<String, String>) -> Option<u32> {
    os_release
        .get("VERSION_ID")?
        .split('.')
        .next()?
        .parse()
        .ok()
}
