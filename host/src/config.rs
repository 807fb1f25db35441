//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - NodeConfig: HTTP port and page refresh of the sensor node.
//!     - NetworkConfig: static addressing of the node (bind address, gateway...).
//!     - SensorConfig: sensor model, data pin and driver.
//!     - MonitorConfig: target node, poll cadence, history and chart files.
//!     - LoggingConfig: log level and whether readings are echoed.
//!
//!     every section and field has a default, so a partial file is valid.
//!
//! ==============================================================================

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::render::Period;
use crate::sensor::{DriverKind, SensorModel};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub node: NodeConfig,
    pub network: NetworkConfig,
    pub sensor: SensorConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NodeConfig {
    pub port: u16,
    /// meta-refresh interval of the `/` page
    pub refresh_seconds: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { port: 80, refresh_seconds: 5 }
    }
}

/// static addressing of the node. radio credentials and interface
/// provisioning stay with the operating system.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub address: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
    pub subnet: Option<Ipv4Addr>,
    pub dns_primary: Option<Ipv4Addr>,
    pub dns_secondary: Option<Ipv4Addr>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            gateway: None,
            subnet: None,
            dns_primary: None,
            dns_secondary: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    pub model: SensorModel,
    pub gpio_pin: u8,
    pub driver: DriverKind,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            model: SensorModel::Dht22,
            gpio_pin: 4,
            driver: DriverKind::Simulated,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    pub host: String,
    pub port: u16,
    pub poll_seconds: u64,
    pub timeout_seconds: u64,
    pub data_dir: PathBuf,
    pub history_file: String,
    /// persist every n-th successful reading
    pub save_every: u32,
    /// keep at most this many records; unset means unbounded
    pub max_records: Option<usize>,
    pub period: Period,
    pub chart_file: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: "10.129.197.172".to_string(),
            port: 80,
            poll_seconds: 1,
            timeout_seconds: 3,
            data_dir: PathBuf::from("data"),
            history_file: "historico.json".to_string(),
            save_every: 1,
            max_records: None,
            period: Period::All,
            chart_file: "trends.html".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl NetworkConfig {
    /// check that a static address, its gateway and subnet agree
    pub fn validate(&self) -> anyhow::Result<()> {
        let Some(mask) = self.subnet else {
            return Ok(());
        };

        let bits = u32::from(mask);
        if bits.leading_ones() + bits.trailing_zeros() != 32 {
            anyhow::bail!("subnet mask {} is not contiguous", mask);
        }

        if let Some(gateway) = self.gateway {
            if !self.address.is_unspecified()
                && u32::from(self.address) & bits != u32::from(gateway) & bits
            {
                anyhow::bail!(
                    "gateway {} is outside the subnet of {}/{}",
                    gateway,
                    self.address,
                    bits.leading_ones()
                );
            }
        }

        Ok(())
    }
}

impl NodeConfig {
    pub fn bind_addr(&self, network: &NetworkConfig) -> SocketAddr {
        SocketAddr::from((network.address, self.port))
    }
}

impl MonitorConfig {
    /// the node's machine-readable endpoint
    pub fn data_url(&self) -> String {
        format!("http://{}:{}/data", self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_seconds.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn chart_path(&self) -> PathBuf {
        self.data_dir.join(&self.chart_file)
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: HostConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        config.network.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[CONFIG] Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    /// Log configuration summary
    pub fn print_summary(&self) {
        tracing::info!("node: listen {} (page refresh {}s)", self.node.bind_addr(&self.network), self.node.refresh_seconds);
        if let Some(gateway) = self.network.gateway {
            tracing::info!(
                "network: gateway {} mask {:?} dns {:?} / {:?}",
                gateway,
                self.network.subnet,
                self.network.dns_primary,
                self.network.dns_secondary
            );
        }
        tracing::info!(
            "sensor: {:?} on gpio {} ({:?} driver)",
            self.sensor.model,
            self.sensor.gpio_pin,
            self.sensor.driver
        );
        tracing::info!(
            "monitor: {} every {}s -> {}",
            self.monitor.data_url(),
            self.monitor.poll_seconds,
            self.monitor.data_dir.join(&self.monitor.history_file).display()
        );
        tracing::info!("log level: {}", self.logging.level);
    }
}
