//! ==============================================================================
//! main.rs - thermo-host entry point
//! ==============================================================================
//!
//! purpose:
//!     picks the process role from the command line:
//!
//!     - `thermo-host node`     reads the sensor and serves / and /data
//!     - `thermo-host monitor`  polls a node, appends to the history log and
//!                              redraws the trend page every tick
//!
//!     both roles run on a single-threaded runtime; neither exits on its own
//!     except through ctrl-c.
//!
//! ==============================================================================

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use thermo_host::config::HostConfig;
use thermo_host::monitor::Monitor;
use thermo_host::sensor;
use thermo_host::server::{self, NodeState};

#[derive(Parser)]
#[command(name = "thermo-host", version, about)]
struct Cli {
    /// path to host.toml (default: config/host.toml, then ../config/host.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// read the sensor and serve `/` and `/data`
    Node {
        /// override [node].port
        #[arg(long)]
        port: Option<u16>,
    },
    /// poll a node, keep the history and draw the trends
    Monitor {
        /// override [monitor].host
        #[arg(long)]
        host: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise [logging].level once the config is known
    let env_filter = std::env::var("RUST_LOG").ok();
    let (filter, filter_handle) =
        reload::Layer::new(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::load_or_default(),
    };
    if env_filter.is_none() {
        filter_handle.reload(EnvFilter::try_new(&config.logging.level)?)?;
    }

    match cli.role {
        Role::Node { port } => {
            if let Some(port) = port {
                config.node.port = port;
            }
            config.print_summary();
            run_node(config).await
        }
        Role::Monitor { host } => {
            if let Some(host) = host {
                config.monitor.host = host;
            }
            config.print_summary();
            run_monitor(config).await
        }
    }
}

async fn run_node(config: HostConfig) -> Result<()> {
    let sensor = sensor::open(&config.sensor)?;
    let state = NodeState::new(sensor, config.node.refresh_seconds, config.logging.show_sensor_data);
    server::run_server(state, config.node.bind_addr(&config.network)).await
}

async fn run_monitor(config: HostConfig) -> Result<()> {
    let mut monitor = Monitor::from_config(&config.monitor, config.logging.show_sensor_data)?;
    monitor.run().await;
    Ok(())
}
