//! Outbound connection builder.

use crate::net::context::SocketOption;
use crate::net::endpoint::Scheme;
use crate::net::error::SocketResult;
use crate::net::stream::Stream;

/// Configuration builder for an outbound connection.
///
/// `start()` runs `create() → connect()` and returns the connected stream.
/// With the `ssl` scheme the connection performs no peer verification, so
/// self-signed servers are reachable.
#[derive(Debug, Clone)]
pub struct Client {
    address: String,
    port: u16,
    scheme: Scheme,
    options: Vec<SocketOption>,
}

impl Client {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            scheme: Scheme::Tcp,
            options: Vec::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Stage a socket option, applied once the connection is up.
    pub fn with_option(mut self, option: SocketOption) -> Self {
        self.options.push(option);
        self
    }

    /// Build the connected stream.
    pub fn start(&self) -> SocketResult<Stream> {
        let mut stream = Stream::new(self.scheme);
        stream.set_address(&self.address);
        stream.set_port(self.port);

        stream.create()?;
        for option in &self.options {
            stream.set_option(option.clone())?;
        }
        stream.connect()?;

        tracing::debug!(target = %stream.target(), "Client connected");
        Ok(stream)
    }
}
