//! Node identity resolution.
//!
//! # Responsibilities
//! - Turn the operator-supplied `[node]` section into the identity the node
//!   advertises (application, IP, port)
//! - Default the port to 7777 when not positive
//! - Resolve the host's outward-facing address when the IP is empty

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use serde::Serialize;

use crate::config::schema::{NodeConfig, DEFAULT_NODE_PORT};
use crate::config::validation::ValidationError;

/// The identity this process advertises. Immutable after boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIdentity {
    pub application: String,
    pub ip: String,
    pub port: u16,
}

impl NodeIdentity {
    /// Resolve an identity, using the host's network address for an empty IP.
    pub fn resolve(config: &NodeConfig) -> Result<Self, ValidationError> {
        Self::resolve_with(config, host_address)
    }

    /// Resolve an identity with a caller-provided host address lookup.
    pub fn resolve_with<F>(config: &NodeConfig, host_addr: F) -> Result<Self, ValidationError>
    where
        F: FnOnce() -> String,
    {
        let port = if config.port <= 0 {
            DEFAULT_NODE_PORT
        } else {
            u16::try_from(config.port).map_err(|_| ValidationError::PortOutOfRange(config.port))?
        };

        let ip = if config.ip.trim().is_empty() {
            host_addr()
        } else {
            config.ip.trim().to_string()
        };

        Ok(Self {
            application: config.application.clone(),
            ip,
            port,
        })
    }

    /// `ip:port` as advertised.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Best-effort lookup of the address other hosts would reach us on.
///
/// Connecting a UDP socket sends nothing; it only asks the OS which local
/// interface routes to the target. Falls back to loopback when no route exists.
pub fn host_address() -> String {
    outbound_ip()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .to_string()
}

fn outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() {
        None
    } else {
        Some(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(ip: &str, port: i64) -> NodeConfig {
        NodeConfig {
            application: "orders".into(),
            ip: ip.into(),
            port,
        }
    }

    #[test]
    fn test_port_defaults_when_not_positive() {
        for port in [0, -1, -7777] {
            let id = NodeIdentity::resolve_with(&node("10.0.0.1", port), || unreachable!()).unwrap();
            assert_eq!(id.port, 7777);
        }
    }

    #[test]
    fn test_explicit_values_kept() {
        let id = NodeIdentity::resolve_with(&node("10.0.0.1", 9000), || unreachable!()).unwrap();
        assert_eq!(id.ip, "10.0.0.1");
        assert_eq!(id.port, 9000);
        assert_eq!(id.application, "orders");
        assert_eq!(id.endpoint(), "10.0.0.1:9000");
    }

    #[test]
    fn test_empty_ip_uses_host_address() {
        let id = NodeIdentity::resolve_with(&node("", 9000), || "192.168.1.20".to_string()).unwrap();
        assert_eq!(id.ip, "192.168.1.20");
    }

    #[test]
    fn test_empty_ip_matches_host_address() {
        let id = NodeIdentity::resolve(&node("", 0)).unwrap();
        assert_eq!(id.ip, host_address());
        assert!(id.ip.parse::<IpAddr>().is_ok());
    }

    #[test]
    fn test_port_out_of_range() {
        let err = NodeIdentity::resolve_with(&node("10.0.0.1", 65_536), || unreachable!()).unwrap_err();
        assert_eq!(err, ValidationError::PortOutOfRange(65_536));
    }
}
