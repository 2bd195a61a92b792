//! hostnet Network Persistence
//!
//! Detects the native network configuration ecosystem of the host and
//! translates the backend-agnostic configuration model into that
//! ecosystem's on-disk artifacts. The filesystem is the only source of
//! truth: there is no in-memory registry and no caching.

pub mod backend;
pub mod detect;
pub mod ifupdown;
pub mod netplan;
pub mod network_manager;
pub mod network_scripts;
pub mod noop;

pub use backend::{create_backend, PersistenceBackend};
pub use detect::{detect_network_backend, HostProbe, SystemProbe};
pub use ifupdown::IfupdownBackend;
pub use netplan::NetplanBackend;
pub use network_manager::NetworkManagerBackend;
pub use network_scripts::NetworkScriptsBackend;
pub use noop::NoOpBackend;
