use std::{
    fmt::Display,
    io::{self, ErrorKind},
    net::{SocketAddr, ToSocketAddrs},
    str::FromStr,
};

use anyhow::Error;

/// Bind/connect address in `host:port` form, resolvable from CLI flags.
#[derive(Debug, Clone)]
pub struct Host(SocketAddr);

impl Host {
    /// Base URL for clients talking to an endpoint hosted at this address.
    pub fn http_base(&self) -> String {
        format!("http://{}", self.0)
    }
}

impl FromStr for Host {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Host(s.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, Error::msg("Missing socket"))
        })?))
    }
}

impl From<SocketAddr> for Host {
    fn from(value: SocketAddr) -> Self {
        Self(value)
    }
}

impl From<Host> for SocketAddr {
    fn from(value: Host) -> Self {
        value.0
    }
}

impl From<&Host> for SocketAddr {
    fn from(value: &Host) -> Self {
        value.0
    }
}

impl Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
