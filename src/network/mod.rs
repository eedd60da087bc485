pub mod cluster;
pub mod messages;
pub mod peer;
pub mod transport;

use crate::error::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// How long a round waits for its answer before giving up.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PORT: &str = "5550";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_WAIT_POOL_SIZE: usize = 4;
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// Largest envelope accepted from the wire.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;
// Documentation range; only used to pick the outbound interface.
const ROUTE_LOOKUP_ADDR: &str = "198.51.100.1:9";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Concurrent response waits allowed at once.
    pub wait_pool_size: usize,
    pub inbox_capacity: usize,
    pub connect_timeout: Duration,
    /// Host peers use to reach this endpoint, whatever address it binds.
    pub advertise_host: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            wait_pool_size: DEFAULT_WAIT_POOL_SIZE,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            advertise_host: None,
        }
    }
}

/// Strips the optional `tcp://` scheme from an endpoint.
pub fn socket_address(endpoint: &str) -> &str {
    endpoint.strip_prefix("tcp://").unwrap_or(endpoint)
}

/// Checks that `host` is a bare host name or IPv4 address, without port or scheme.
pub fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == ':' || c == '/') {
        return Err(ConfigError::InvalidAddress(host.to_string()));
    }
    Ok(())
}

/// Address of the interface this machine routes other hosts through, or
/// loopback when there is no route.
pub async fn outbound_host() -> String {
    match outbound_ip().await {
        Ok(ip) if !ip.is_unspecified() => ip.to_string(),
        Ok(_) => DEFAULT_HOST.to_string(),
        Err(e) => {
            debug!("No outbound route, falling back to {}: {}", DEFAULT_HOST, e);
            DEFAULT_HOST.to_string()
        }
    }
}

async fn outbound_ip() -> std::io::Result<IpAddr> {
    // Connecting a UDP socket selects a route without sending anything.
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(ROUTE_LOOKUP_ADDR).await?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_carry_no_port_or_scheme() {
        assert!(validate_host("10.0.0.5").is_ok());
        assert!(validate_host("ring-a.local").is_ok());
        for bad in ["", "10.0.0.5:7000", "tcp://10.0.0.5", "a host"] {
            assert!(matches!(
                validate_host(bad),
                Err(ConfigError::InvalidAddress(_))
            ));
        }
    }

    #[tokio::test]
    async fn outbound_host_is_a_concrete_address() {
        let host = outbound_host().await;
        let ip: IpAddr = host.parse().unwrap();
        assert!(!ip.is_unspecified());
    }

    #[test]
    fn accepts_tcp_scheme() {
        assert_eq!(socket_address("tcp://10.0.0.1:5550"), "10.0.0.1:5550");
        assert_eq!(socket_address("10.0.0.1:5550"), "10.0.0.1:5550");
    }
}
