//! Node configuration, fixed at build time.
//!
//! ```text
//! SSID=... PASSWORD=... NODE_ID=2 cargo build --release --features firmware --bin inside-aht20
//! ```

use core::time::Duration;

use crate::error::ConfigError;

/// Port the collector and the phone app query
pub const DEFAULT_UDP_PORT: u16 = 16083;
pub const DEFAULT_MEASURE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Sent with every reply, the collector maps it to a location name
    pub node_id: u8,
    pub udp_port: u16,
    pub measure_interval: Duration,
    pub ssid: &'static str,
    pub password: &'static str,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            udp_port: DEFAULT_UDP_PORT,
            measure_interval: DEFAULT_MEASURE_INTERVAL,
            ssid: "",
            password: "",
        }
    }
}

impl NodeConfig {
    /// Configuration from the environment of the build.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::parse(
            option_env!("NODE_ID"),
            option_env!("UDP_PORT"),
            option_env!("MEASURE_INTERVAL_SECS"),
            option_env!("SSID").unwrap_or(""),
            option_env!("PASSWORD").unwrap_or(""),
        )
    }

    /// Unset values fall back to the defaults.
    pub fn parse(
        node_id: Option<&str>,
        udp_port: Option<&str>,
        measure_interval_secs: Option<&str>,
        ssid: &'static str,
        password: &'static str,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let node_id = match node_id {
            Some(s) => s.trim().parse().map_err(|_| ConfigError::InvalidNodeId)?,
            None => defaults.node_id,
        };

        let udp_port = match udp_port {
            Some(s) => match s.trim().parse::<u16>() {
                Ok(0) | Err(_) => return Err(ConfigError::InvalidPort),
                Ok(port) => port,
            },
            None => defaults.udp_port,
        };

        let measure_interval = match measure_interval_secs {
            Some(s) => match s.trim().parse::<u64>() {
                Ok(0) | Err(_) => return Err(ConfigError::InvalidInterval),
                Ok(secs) => Duration::from_secs(secs),
            },
            None => defaults.measure_interval,
        };

        Ok(Self {
            node_id,
            udp_port,
            measure_interval,
            ssid,
            password,
        })
    }
}
