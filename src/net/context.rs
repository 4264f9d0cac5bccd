//! Connection context: staged socket options and TLS configuration.
//!
//! # Responsibilities
//! - Hold typed socket options staged before a resource exists
//! - Carry the server-side TLS configuration for `ssl` endpoints
//! - Apply options to a live socket on demand

use std::io;
use std::sync::Arc;
use std::time::Duration;

use socket2::Socket;

use crate::net::tls::TlsOptions;

/// A typed socket option.
///
/// Options are staged in the context while no resource exists and applied at
/// bind/connect time; with a live resource they are applied immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOption {
    /// `SO_REUSEADDR`.
    ReuseAddress(bool),
    /// `TCP_NODELAY`.
    NoDelay(bool),
    /// `SO_LINGER`; `None` disables lingering.
    Linger(Option<Duration>),
    /// `SO_RCVTIMEO`; `None` removes the timeout.
    ReceiveTimeout(Option<Duration>),
    /// `SO_SNDTIMEO`; `None` removes the timeout.
    SendTimeout(Option<Duration>),
}

impl SocketOption {
    /// The OS-level option name, used in error reports and logs.
    pub fn name(&self) -> &'static str {
        match self {
            SocketOption::ReuseAddress(_) => "SO_REUSEADDR",
            SocketOption::NoDelay(_) => "TCP_NODELAY",
            SocketOption::Linger(_) => "SO_LINGER",
            SocketOption::ReceiveTimeout(_) => "SO_RCVTIMEO",
            SocketOption::SendTimeout(_) => "SO_SNDTIMEO",
        }
    }
}

/// Apply one option to a socket.
pub(crate) fn apply_option(option: &SocketOption, sock: &Socket) -> io::Result<()> {
    match option {
        SocketOption::ReuseAddress(on) => sock.set_reuse_address(*on),
        SocketOption::NoDelay(on) => sock.set_nodelay(*on),
        SocketOption::Linger(duration) => sock.set_linger(*duration),
        SocketOption::ReceiveTimeout(duration) => sock.set_read_timeout(*duration),
        SocketOption::SendTimeout(duration) => sock.set_write_timeout(*duration),
    }
}

/// In-process configuration container allocated by `create()`.
#[derive(Debug, Default)]
pub struct SocketContext {
    staged: Vec<SocketOption>,
    tls_options: Option<TlsOptions>,
    tls_server: Option<Arc<rustls::ServerConfig>>,
}

impl SocketContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an option for the next bind/connect.
    ///
    /// Staging the same option kind twice keeps only the latest value.
    pub fn stage(&mut self, option: SocketOption) {
        self.staged
            .retain(|staged| staged.name() != option.name());
        self.staged.push(option);
    }

    pub fn staged(&self) -> &[SocketOption] {
        &self.staged
    }

    /// Install the TLS options and the server configuration built from them.
    pub(crate) fn set_tls(&mut self, options: TlsOptions, config: Arc<rustls::ServerConfig>) {
        self.tls_options = Some(options);
        self.tls_server = Some(config);
    }

    pub fn tls_options(&self) -> Option<&TlsOptions> {
        self.tls_options.as_ref()
    }

    pub(crate) fn tls_server(&self) -> Option<&Arc<rustls::ServerConfig>> {
        self.tls_server.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_replaces_same_option_kind() {
        let mut context = SocketContext::new();
        context.stage(SocketOption::NoDelay(false));
        context.stage(SocketOption::ReuseAddress(true));
        context.stage(SocketOption::NoDelay(true));

        assert_eq!(context.staged().len(), 2);
        assert!(context
            .staged()
            .contains(&SocketOption::NoDelay(true)));
        assert!(!context
            .staged()
            .contains(&SocketOption::NoDelay(false)));
    }

    #[test]
    fn test_new_context_has_no_tls() {
        let context = SocketContext::new();
        assert!(context.tls_options().is_none());
        assert!(context.tls_server().is_none());
        assert!(context.staged().is_empty());
    }
}
