//! Listener configuration types

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::{parse_env, ConfigError, ConfigResult};

/// Default port, matching the port web clients are built against
pub const DEFAULT_PORT: u16 = 3000;

/// Address the HTTP/WebSocket listener binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Interface to bind (default: all interfaces)
    pub bind_address: IpAddr,

    /// TCP port (default: 3000)
    pub port: u16,
}

impl ListenerConfig {
    /// Load listener configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), format!("{}", e)))?,
            _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        Ok(Self {
            bind_address,
            port: parse_env("PORT", DEFAULT_PORT)?,
        })
    }

    /// Create a loopback listener on the given port (useful for testing)
    pub fn loopback(port: u16) -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
        }
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}
