//! Socket error definitions.

use std::io;

use thiserror::Error;

/// Errors that can occur across the socket lifecycle.
///
/// Every variant that originates in a syscall carries the OS error code and
/// message. Nothing is swallowed: "no connection yet" on a non-blocking
/// accept and "no data yet" on a non-blocking read are ordinary values, not
/// errors, and are therefore absent here.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Connection context allocation failed.
    #[error("Failed to create connection context: {0}")]
    ContextCreation(String),

    /// Outbound connect failed; the handle stays unset.
    #[error("Failed to connect to {target}: {message}")]
    Connection {
        target: String,
        message: String,
        code: Option<i32>,
    },

    /// Bind or listen failed. When bind-failure cleanup also failed, the
    /// teardown error is chained as the source.
    #[error("Failed to listen on {target}: {message}")]
    Listen {
        target: String,
        message: String,
        code: Option<i32>,
        #[source]
        cleanup: Option<Box<SocketError>>,
    },

    /// Blocking-mode change failed at the OS level; the in-process flag keeps
    /// its previous value.
    #[error("Failed to switch to {mode} mode: {message}")]
    Mode {
        mode: &'static str,
        message: String,
        code: Option<i32>,
    },

    /// Accept failed in blocking mode, including accept-timeout expiry.
    #[error("Failed to accept a connection: {message}")]
    Accept { message: String, code: Option<i32> },

    /// Read failed with a genuine I/O error, distinct from "no data yet".
    #[error("Failed to read from socket: {message}")]
    Read { message: String, code: Option<i32> },

    /// Write failed.
    #[error("Failed to write to socket: {message}")]
    Write { message: String, code: Option<i32> },

    /// OS-level shutdown failed.
    #[error("Failed to shut down socket: {message}")]
    Shutdown { message: String, code: Option<i32> },

    /// Socket option could not be applied.
    #[error("Failed to apply socket option {name}: {message}")]
    SetOption {
        name: &'static str,
        message: String,
        code: Option<i32>,
    },

    /// Certificate validation, parsing, or TLS configuration failed.
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Operation on an unset or closed handle.
    #[error("Socket resource is closed")]
    Closed,
}

/// Result type for socket operations.
pub type SocketResult<T> = Result<T, SocketError>;

impl SocketError {
    pub(crate) fn connection(target: &str, err: &io::Error) -> Self {
        SocketError::Connection {
            target: target.to_string(),
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    pub(crate) fn connection_msg(target: &str, message: impl Into<String>) -> Self {
        SocketError::Connection {
            target: target.to_string(),
            message: message.into(),
            code: None,
        }
    }

    pub(crate) fn listen(target: &str, err: &io::Error) -> Self {
        SocketError::Listen {
            target: target.to_string(),
            message: err.to_string(),
            code: err.raw_os_error(),
            cleanup: None,
        }
    }

    pub(crate) fn listen_msg(target: &str, message: impl Into<String>) -> Self {
        SocketError::Listen {
            target: target.to_string(),
            message: message.into(),
            code: None,
            cleanup: None,
        }
    }

    /// Attach a teardown failure to a `Listen` error as its source.
    ///
    /// For any other variant the teardown failure is dropped by the caller's
    /// contract, so this is a no-op.
    pub(crate) fn with_cleanup(self, cleanup: SocketError) -> Self {
        match self {
            SocketError::Listen {
                target,
                message,
                code,
                ..
            } => SocketError::Listen {
                target,
                message,
                code,
                cleanup: Some(Box::new(cleanup)),
            },
            other => other,
        }
    }

    pub(crate) fn mode(blocking: bool, err: &io::Error) -> Self {
        SocketError::Mode {
            mode: if blocking { "blocking" } else { "non-blocking" },
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    pub(crate) fn accept(err: &io::Error) -> Self {
        SocketError::Accept {
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    pub(crate) fn accept_msg(message: impl Into<String>) -> Self {
        SocketError::Accept {
            message: message.into(),
            code: None,
        }
    }

    pub(crate) fn read(err: &io::Error) -> Self {
        SocketError::Read {
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    pub(crate) fn read_msg(message: impl Into<String>) -> Self {
        SocketError::Read {
            message: message.into(),
            code: None,
        }
    }

    pub(crate) fn write(err: &io::Error) -> Self {
        SocketError::Write {
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    pub(crate) fn shutdown(err: &io::Error) -> Self {
        SocketError::Shutdown {
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    pub(crate) fn option(name: &'static str, err: &io::Error) -> Self {
        SocketError::SetOption {
            name,
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    /// The originating OS error code, when one was captured.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            SocketError::Connection { code, .. }
            | SocketError::Listen { code, .. }
            | SocketError::Mode { code, .. }
            | SocketError::Accept { code, .. }
            | SocketError::Read { code, .. }
            | SocketError::Write { code, .. }
            | SocketError::Shutdown { code, .. }
            | SocketError::SetOption { code, .. } => *code,
            SocketError::ContextCreation(_)
            | SocketError::Certificate(_)
            | SocketError::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = SocketError::Connection {
            target: "tcp://127.0.0.1:9999".into(),
            message: "refused".into(),
            code: Some(111),
        };
        assert_eq!(
            err.to_string(),
            "Failed to connect to tcp://127.0.0.1:9999: refused"
        );

        let err = SocketError::Mode {
            mode: "non-blocking",
            message: "bad fd".into(),
            code: Some(9),
        };
        assert!(err.to_string().contains("non-blocking"));
    }

    #[test]
    fn test_os_code_passthrough() {
        let io_err = io::Error::from_raw_os_error(98);
        let err = SocketError::listen("tcp://127.0.0.1:80", &io_err);
        assert_eq!(err.os_code(), Some(98));
        assert!(matches!(err, SocketError::Listen { .. }));
        assert_eq!(SocketError::Closed.os_code(), None);
    }

    #[test]
    fn test_listen_cleanup_chains_as_source() {
        let bind = SocketError::listen(
            "tcp://127.0.0.1:80",
            &io::Error::from_raw_os_error(98),
        );
        assert!(bind.source().is_none());

        let teardown = SocketError::shutdown(&io::Error::from_raw_os_error(32));
        let chained = bind.with_cleanup(teardown);
        let source = chained.source().expect("cleanup failure should chain");
        assert!(source.to_string().contains("shut down"));
    }

    #[test]
    fn test_with_cleanup_on_other_variants_is_noop() {
        let err = SocketError::Closed.with_cleanup(SocketError::Closed);
        assert!(matches!(err, SocketError::Closed));
        assert!(err.source().is_none());
    }
}
