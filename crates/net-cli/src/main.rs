//! hostnet Network CLI (hostnetctl)

use std::net::Ipv4Addr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use hostnet_core::{
    AddressConfig, BackendType, BondConfig, BondMode, BridgeConfig, InterfaceConfig, VlanConfig,
};
use hostnet_persist::{create_backend, detect_network_backend, PersistenceBackend};

#[derive(Parser)]
#[command(name = "hostnetctl")]
#[command(about = "hostnet Network Persistence CLI")]
#[command(version)]
#[command(long_about = "
hostnet Network Persistence CLI

This tool detects the network configuration ecosystem native to the
host (netplan, NetworkManager, network-scripts or ifupdown) and
persists interface, bridge, bond and VLAN configuration into that
ecosystem's on-disk files.

Examples:
  hostnetctl detect                                 # Print the detected backend
  hostnetctl save interface eth0 -a 10.0.0.5/24 -g 10.0.0.1
  hostnetctl save bridge br0 -m eth0 -m eth1 --stp
  hostnetctl save bond bond0 --mode active-backup -m eth0 -m eth1
  hostnetctl save vlan vlan100 --parent eth0 --id 100
  hostnetctl delete bridge br0                      # Remove bridge artifacts
  hostnetctl reload                                 # Apply persisted state
")]
struct Cli {
    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific backend for save/delete/reload instead of
    /// detecting one (detect always reports the detection result)
    #[arg(short, long, global = true)]
    backend: Option<BackendType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the network configuration backend native to this host
    Detect,

    /// Persist configuration into the native backend
    Save {
        #[command(subcommand)]
        entity: SaveEntity,
    },

    /// Remove persisted configuration from the native backend
    Delete {
        #[command(subcommand)]
        entity: DeleteEntity,
    },

    /// Apply the persisted state to the running system
    Reload,
}

#[derive(Subcommand)]
enum SaveEntity {
    /// Persist a plain interface
    Interface {
        /// Interface name
        name: String,

        /// Static address in CIDR notation (repeatable)
        #[arg(short, long = "address")]
        addresses: Vec<AddressConfig>,

        /// Default gateway
        #[arg(short, long)]
        gateway: Option<Ipv4Addr>,

        /// Interface MTU
        #[arg(long)]
        mtu: Option<u32>,

        /// Do not bring the interface up at boot
        #[arg(long)]
        no_auto_start: bool,
    },

    /// Persist a bridge and its member interfaces
    Bridge {
        /// Bridge name
        name: String,

        /// Member interface (repeatable)
        #[arg(short, long = "member")]
        members: Vec<String>,

        /// Enable spanning tree protocol
        #[arg(long)]
        stp: bool,

        /// Static address in CIDR notation (repeatable)
        #[arg(short, long = "address")]
        addresses: Vec<AddressConfig>,

        /// Do not bring the bridge up at boot
        #[arg(long)]
        no_auto_start: bool,
    },

    /// Persist a bond and its member interfaces
    Bond {
        /// Bond name
        name: String,

        /// Bonding mode (name or kernel number)
        #[arg(long, default_value = "active-backup")]
        mode: BondMode,

        /// Member interface (repeatable)
        #[arg(short, long = "member")]
        members: Vec<String>,

        /// Static address in CIDR notation (repeatable)
        #[arg(short, long = "address")]
        addresses: Vec<AddressConfig>,

        /// Do not bring the bond up at boot
        #[arg(long)]
        no_auto_start: bool,
    },

    /// Persist a VLAN on top of a parent interface
    Vlan {
        /// VLAN interface name
        name: String,

        /// Parent interface
        #[arg(short, long)]
        parent: String,

        /// VLAN id (1-4094)
        #[arg(long)]
        id: u16,

        /// Static address in CIDR notation (repeatable)
        #[arg(short, long = "address")]
        addresses: Vec<AddressConfig>,

        /// Do not bring the VLAN up at boot
        #[arg(long)]
        no_auto_start: bool,
    },
}

#[derive(Subcommand)]
enum DeleteEntity {
    /// Remove a plain interface
    Interface { name: String },
    /// Remove a bridge and its member artifacts
    Bridge { name: String },
    /// Remove a bond and its member artifacts
    Bond { name: String },
    /// Remove a VLAN
    Vlan { name: String },
}

async fn run_save(backend: &dyn PersistenceBackend, entity: SaveEntity) -> Result<()> {
    match entity {
        SaveEntity::Interface {
            name,
            addresses,
            gateway,
            mtu,
            no_auto_start,
        } => {
            let mut config = InterfaceConfig::new(name).with_auto_start(!no_auto_start);
            config.addresses = addresses;
            config.gateway = gateway;
            config.mtu = mtu;
            backend.save_interface(&config).await?;
        }

        SaveEntity::Bridge {
            name,
            members,
            stp,
            addresses,
            no_auto_start,
        } => {
            let mut config = BridgeConfig::new(name)
                .with_stp(stp)
                .with_auto_start(!no_auto_start);
            config.members = members;
            config.addresses = addresses;
            backend.save_bridge(&config).await?;
        }

        SaveEntity::Bond {
            name,
            mode,
            members,
            addresses,
            no_auto_start,
        } => {
            let mut config = BondConfig::new(name, mode).with_auto_start(!no_auto_start);
            config.members = members;
            config.addresses = addresses;
            backend.save_bond(&config).await?;
        }

        SaveEntity::Vlan {
            name,
            parent,
            id,
            addresses,
            no_auto_start,
        } => {
            let mut config = VlanConfig::new(name, parent, id)?.with_auto_start(!no_auto_start);
            config.addresses = addresses;
            backend.save_vlan(&config).await?;
        }
    }

    Ok(())
}

fn resolve_backend(requested: Option<BackendType>) -> BackendType {
    requested.unwrap_or_else(detect_network_backend)
}

async fn run_delete(backend: &dyn PersistenceBackend, entity: DeleteEntity) -> Result<()> {
    match entity {
        DeleteEntity::Interface { name } => backend.delete_interface(&name).await?,
        DeleteEntity::Bridge { name } => backend.delete_bridge(&name).await?,
        DeleteEntity::Bond { name } => backend.delete_bond(&name).await?,
        DeleteEntity::Vlan { name } => backend.delete_vlan(&name).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        // Always reports what the host actually runs; --backend only
        // overrides the backend used by save/delete/reload
        Commands::Detect => {
            println!("{}", detect_network_backend());
            Ok(())
        }

        Commands::Save { entity } => match create_backend(resolve_backend(cli.backend)) {
            Ok(backend) => run_save(backend.as_ref(), entity).await,
            Err(e) => Err(e.into()),
        },

        Commands::Delete { entity } => match create_backend(resolve_backend(cli.backend)) {
            Ok(backend) => run_delete(backend.as_ref(), entity).await,
            Err(e) => Err(e.into()),
        },

        Commands::Reload => match create_backend(resolve_backend(cli.backend)) {
            Ok(backend) => backend.system_reload().await.map_err(Into::into),
            Err(e) => Err(e.into()),
        },
    };

    match result {
        Ok(()) => {
            if !cli.quiet {
                log::info!("Command completed successfully");
            }
            std::process::exit(0);
        }
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);

                // Print error chain if in verbose mode
                if cli.verbose || cli.debug {
                    let mut source = e.source();
                    while let Some(err) = source {
                        eprintln!("  Caused by: {}", err);
                        source = err.source();
                    }
                }
            }
            std::process::exit(1);
        }
    }
}
