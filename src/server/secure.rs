//! TLS listening server builder.

use std::path::{Path, PathBuf};

use crate::net::context::SocketOption;
use crate::net::endpoint::{Scheme, DEFAULT_BACKLOG};
use crate::net::error::SocketResult;
use crate::net::stream::{Stream, DEFAULT_ACCEPT_TIMEOUT_SECS};
use crate::net::tls::{self, TlsOptions};

/// Configuration builder for an `ssl` listener.
///
/// `start()` validates the certificate file before anything else, so a bad
/// path fails before any context or socket exists. It then drives
/// `create() → enable_ssl() → listen() → set_block()`; the endpoint scheme is
/// `ssl` from construction onward, never toggled mid-pipeline.
#[derive(Debug, Clone)]
pub struct SecureServer {
    address: String,
    port: u16,
    backlog: i32,
    accept_timeout_secs: i64,
    cert_path: PathBuf,
    passphrase: String,
    options: Vec<SocketOption>,
}

impl SecureServer {
    pub fn new(address: impl Into<String>, port: u16, cert_path: impl Into<PathBuf>) -> Self {
        Self {
            address: address.into(),
            port,
            backlog: DEFAULT_BACKLOG,
            accept_timeout_secs: DEFAULT_ACCEPT_TIMEOUT_SECS,
            cert_path: cert_path.into(),
            passphrase: String::new(),
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

    /// Private key passphrase; the empty string means none.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    /// Stage a socket option, applied at bind time.
    pub fn with_option(mut self, option: SocketOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// Build the listening stream.
    pub fn start(&self) -> SocketResult<Stream> {
        // validate before acquire: a missing certificate must not cost a
        // context or a socket
        tls::validate_cert_file(&self.cert_path)?;

        let mut stream = Stream::new(Scheme::Ssl);
        stream.set_address(&self.address);
        stream.set_port(self.port);
        stream.set_backlog(self.backlog);
        stream.set_accept_timeout(self.accept_timeout_secs);

        stream.create()?;
        stream.enable_ssl(self.tls_options())?;
        for option in &self.options {
            stream.set_option(option.clone())?;
        }
        stream.listen()?;
        stream.set_block()?;

        tracing::info!(
            target = %stream.target(),
            cert = %self.cert_path.display(),
            "Secure server started"
        );
        Ok(stream)
    }

    fn tls_options(&self) -> TlsOptions {
        // with_passphrase drops empty strings, so the passphrase is only
        // carried when one was actually configured
        TlsOptions::new(&self.cert_path).with_passphrase(self.passphrase.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let server = SecureServer::new("127.0.0.1", 0, "/tmp/server.pem");
        assert_eq!(server.backlog, 100);
        assert_eq!(server.accept_timeout_secs, -1);
        assert_eq!(server.cert_path(), Path::new("/tmp/server.pem"));
        assert!(server.passphrase.is_empty());
    }

    #[test]
    fn test_empty_passphrase_is_dropped_from_options() {
        let server = SecureServer::new("127.0.0.1", 0, "/tmp/server.pem");
        assert!(server.tls_options().passphrase.is_none());

        let server = server.with_passphrase("secret");
        assert_eq!(server.tls_options().passphrase.as_deref(), Some("secret"));
    }
}
