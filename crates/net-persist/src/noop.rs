//! Fallback backend for hosts with no recognized ecosystem
//!
//! Every operation succeeds without touching the filesystem, so
//! callers never special-case a missing backend.

use async_trait::async_trait;
use log::debug;

use hostnet_core::{
    BackendType, BondConfig, BridgeConfig, InterfaceConfig, Result, VlanConfig,
};

use crate::backend::PersistenceBackend;

pub struct NoOpBackend;

#[async_trait]
impl PersistenceBackend for NoOpBackend {
    async fn save_interface(&self, config: &InterfaceConfig) -> Result<()> {
        debug!("no-op backend: skipping save of interface {}", config.name);
        Ok(())
    }

    async fn delete_interface(&self, name: &str) -> Result<()> {
        debug!("no-op backend: skipping delete of interface {}", name);
        Ok(())
    }

    async fn save_bridge(&self, config: &BridgeConfig) -> Result<()> {
        debug!("no-op backend: skipping save of bridge {}", config.name);
        Ok(())
    }

    async fn delete_bridge(&self, name: &str) -> Result<()> {
        debug!("no-op backend: skipping delete of bridge {}", name);
        Ok(())
    }

    async fn save_bond(&self, config: &BondConfig) -> Result<()> {
        debug!("no-op backend: skipping save of bond {}", config.name);
        Ok(())
    }

    async fn delete_bond(&self, name: &str) -> Result<()> {
        debug!("no-op backend: skipping delete of bond {}", name);
        Ok(())
    }

    async fn save_vlan(&self, config: &VlanConfig) -> Result<()> {
        debug!("no-op backend: skipping save of vlan {}", config.name);
        Ok(())
    }

    async fn delete_vlan(&self, name: &str) -> Result<()> {
        debug!("no-op backend: skipping delete of vlan {}", name);
        Ok(())
    }

    async fn system_reload(&self) -> Result<()> {
        debug!("no-op backend: skipping reload");
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::None
    }
}
