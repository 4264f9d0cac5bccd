//! Plain TCP listening server builder.

use crate::net::context::SocketOption;
use crate::net::endpoint::{Scheme, DEFAULT_ADDRESS, DEFAULT_BACKLOG, DEFAULT_PORT};
use crate::net::error::SocketResult;
use crate::net::stream::{Stream, DEFAULT_ACCEPT_TIMEOUT_SECS};

/// Configuration builder for a plain `tcp` listener.
///
/// `start()` is an ordered pipeline over the socket lifecycle:
/// `create() → listen() → set_block()`. The first failing step propagates and
/// no further step runs; the partially built stream is dropped, so a failed
/// start leaves no open resource behind.
#[derive(Debug, Clone)]
pub struct Server {
    address: String,
    port: u16,
    backlog: i32,
    accept_timeout_secs: i64,
    options: Vec<SocketOption>,
}

impl Server {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            backlog: DEFAULT_BACKLOG,
            accept_timeout_secs: DEFAULT_ACCEPT_TIMEOUT_SECS,
            options: Vec::new(),
        }
    }

    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Accept timeout in seconds; values `<= 0` leave accept unbounded.
    pub fn with_accept_timeout(mut self, secs: i64) -> Self {
        self.accept_timeout_secs = secs;
        self
    }

    /// Stage a socket option, applied at bind time.
    pub fn with_option(mut self, option: SocketOption) -> Self {
        self.options.push(option);
        self
    }

    /// Build the listening stream.
    pub fn start(&self) -> SocketResult<Stream> {
        let mut stream = Stream::new(Scheme::Tcp);
        stream.set_address(&self.address);
        stream.set_port(self.port);
        stream.set_backlog(self.backlog);
        stream.set_accept_timeout(self.accept_timeout_secs);

        stream.create()?;
        for option in &self.options {
            stream.set_option(option.clone())?;
        }
        stream.listen()?;
        stream.set_block()?;

        tracing::info!(target = %stream.target(), "Server started");
        Ok(stream)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let server = Server::default();
        assert_eq!(server.address, "127.0.0.1");
        assert_eq!(server.port, 0);
        assert_eq!(server.backlog, 100);
        assert_eq!(server.accept_timeout_secs, -1);
        assert!(server.options.is_empty());
    }

    #[test]
    fn test_builder_overrides() {
        let server = Server::new("0.0.0.0", 7000)
            .with_backlog(16)
            .with_accept_timeout(5)
            .with_option(SocketOption::NoDelay(true));
        assert_eq!(server.address, "0.0.0.0");
        assert_eq!(server.port, 7000);
        assert_eq!(server.backlog, 16);
        assert_eq!(server.accept_timeout_secs, 5);
        assert_eq!(server.options.len(), 1);
    }
}
