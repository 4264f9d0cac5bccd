//! Endpoint configuration and listen-target rendering.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Default bind address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Default port; `0` lets the OS assign one.
pub const DEFAULT_PORT: u16 = 0;

/// Default accept backlog.
pub const DEFAULT_BACKLOG: i32 = 100;

/// Connection scheme for the listen/connect target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP.
    Tcp,
    /// TLS over TCP.
    Ssl,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Ssl => "ssl",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a socket binds or connects.
///
/// The scheme is fixed at construction; address, port, and backlog may be
/// changed only before `listen()`/`connect()` takes effect. Reconfiguring a
/// bound endpoint never re-binds the live socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    address: String,
    port: u16,
    backlog: i32,
}

impl Endpoint {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme,
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn backlog(&self) -> i32 {
        self.backlog
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn set_backlog(&mut self, backlog: i32) {
        self.backlog = backlog;
    }

    /// The `"<scheme>://<address>:<port>"` listen target.
    ///
    /// Pure function of the endpoint; repeated calls yield identical strings.
    pub fn target(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.address, self.port)
    }

    /// Resolve the configured address and port to one socket address.
    pub(crate) fn resolve(&self) -> io::Result<SocketAddr> {
        (self.address.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("address {} did not resolve", self.address),
                )
            })
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(Scheme::Tcp)
    }
}
