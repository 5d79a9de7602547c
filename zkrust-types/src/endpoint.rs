//! Terminal network address

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use crate::error::Error;

/// UDP port terminals listen on
pub const DEFAULT_PORT: u16 = 4370;

/// IPv4 address and UDP port of a terminal
///
/// ```
/// use zkrust_types::Endpoint;
///
/// let endpoint: Endpoint = "192.168.1.201".parse().unwrap();
/// assert_eq!(endpoint.port, 4370);
///
/// let endpoint: Endpoint = "10.0.0.5:5005".parse().unwrap();
/// assert_eq!(endpoint.to_string(), "10.0.0.5:5005");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl From<Ipv4Addr> for Endpoint {
    fn from(ip: Ipv4Addr) -> Self {
        Self::new(ip, DEFAULT_PORT)
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = match s.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| Error::Parse(format!("invalid port {:?}: {}", port, e)))?;
                (host, port)
            }
            None => (s, DEFAULT_PORT),
        };

        let ip = host
            .parse::<Ipv4Addr>()
            .map_err(|e| Error::Parse(format!("invalid IPv4 address {:?}: {}", host, e)))?;

        Ok(Self::new(ip, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_port() {
        let endpoint: Endpoint = "192.168.1.201".parse().unwrap();
        assert_eq!(endpoint, Endpoint::new(Ipv4Addr::new(192, 168, 1, 201), 4370));

        let endpoint: Endpoint = " 10.0.0.1:4371 ".parse().unwrap();
        assert_eq!(endpoint.port, 4371);
        assert_eq!(endpoint.socket_addr().to_string(), "10.0.0.1:4371");
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Endpoint>().is_err());
        assert!("device.local".parse::<Endpoint>().is_err());
        assert!("10.0.0.1:port".parse::<Endpoint>().is_err());
        assert!("10.0.0.1:70000".parse::<Endpoint>().is_err());
        assert!("::1".parse::<Endpoint>().is_err());
    }
}
