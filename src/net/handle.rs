//! Socket handle: resource ownership, mode flag, and teardown.
//!
//! # Responsibilities
//! - Own at most one live OS resource (listener, plain stream, or TLS stream)
//! - Track the in-process blocking flag and the default accept timeout
//! - Provide the fallible teardown that `listen()` cleanup and `close()` share

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::ops::DerefMut;
use std::sync::Arc;

use rustls::{ClientConnection, ConnectionCommon, ServerConnection, SideData, StreamOwned};
use socket2::SockRef;

use crate::net::error::{SocketError, SocketResult};
use crate::net::stream::DEFAULT_ACCEPT_TIMEOUT_SECS;

/// The OS-level resource a handle may own.
pub(crate) enum Resource {
    /// A bound, listening socket; carries the TLS acceptor for `ssl` endpoints.
    Listener {
        listener: TcpListener,
        tls: Option<Arc<rustls::ServerConfig>>,
    },
    /// A plain TCP data stream.
    Plain(TcpStream),
    /// An accepted TLS session (server side).
    ServerTls(StreamOwned<ServerConnection, TcpStream>),
    /// An outbound TLS session (client side).
    ClientTls(StreamOwned<ClientConnection, TcpStream>),
}

impl Resource {
    /// Borrow the underlying OS socket, whatever the resource kind.
    pub(crate) fn sock_ref(&self) -> SockRef<'_> {
        match self {
            Resource::Listener { listener, .. } => SockRef::from(listener),
            Resource::Plain(stream) => SockRef::from(stream),
            Resource::ServerTls(stream) => SockRef::from(stream.get_ref()),
            Resource::ClientTls(stream) => SockRef::from(stream.get_ref()),
        }
    }

    pub(crate) fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Resource::Listener { listener, .. } => listener.local_addr(),
            Resource::Plain(stream) => stream.local_addr(),
            Resource::ServerTls(stream) => stream.get_ref().local_addr(),
            Resource::ClientTls(stream) => stream.get_ref().local_addr(),
        }
    }

    pub(crate) fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Resource::Listener { .. } => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "listening socket has no peer",
            )),
            Resource::Plain(stream) => stream.peer_addr(),
            Resource::ServerTls(stream) => stream.get_ref().peer_addr(),
            Resource::ClientTls(stream) => stream.get_ref().peer_addr(),
        }
    }
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Resource::Listener { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "listening socket is not a data stream",
            )),
            Resource::Plain(stream) => stream.read(buf),
            Resource::ServerTls(stream) => stream.read(buf),
            Resource::ClientTls(stream) => stream.read(buf),
        }
    }
}

impl Write for Resource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Resource::Listener { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "listening socket is not a data stream",
            )),
            Resource::Plain(stream) => stream.write(buf),
            Resource::ServerTls(stream) => stream.write(buf),
            Resource::ClientTls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Resource::Listener { .. } => Ok(()),
            Resource::Plain(stream) => stream.flush(),
            Resource::ServerTls(stream) => stream.flush(),
            Resource::ClientTls(stream) => stream.flush(),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Listener { .. } => "Listener",
            Resource::Plain(_) => "Plain",
            Resource::ServerTls(_) => "ServerTls",
            Resource::ClientTls(_) => "ClientTls",
        })
    }
}

/// Owns at most one live OS resource plus its mode flag and accept timeout.
///
/// A handle is either unset or refers to exactly one live resource. `release`
/// always unsets it, even when the teardown itself fails.
#[derive(Debug)]
pub(crate) struct Handle {
    resource: Option<Resource>,
    blocking: bool,
    accept_timeout_secs: i64,
}

impl Handle {
    pub(crate) fn new() -> Self {
        Self {
            resource: None,
            blocking: true,
            accept_timeout_secs: DEFAULT_ACCEPT_TIMEOUT_SECS,
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        self.resource.is_some()
    }

    pub(crate) fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub(crate) fn set_blocking_flag(&mut self, blocking: bool) {
        self.blocking = blocking;
    }

    pub(crate) fn accept_timeout_secs(&self) -> i64 {
        self.accept_timeout_secs
    }

    pub(crate) fn set_accept_timeout_secs(&mut self, secs: i64) {
        self.accept_timeout_secs = secs;
    }

    pub(crate) fn set(&mut self, resource: Resource) {
        self.resource = Some(resource);
    }

    pub(crate) fn resource(&self) -> SocketResult<&Resource> {
        self.resource.as_ref().ok_or(SocketError::Closed)
    }

    pub(crate) fn resource_mut(&mut self) -> SocketResult<&mut Resource> {
        self.resource.as_mut().ok_or(SocketError::Closed)
    }

    /// Fallible teardown. Always unsets the handle.
    ///
    /// TLS sessions flush a close_notify alert; the write can fail when the
    /// transport is already dead, and that failure is the one `listen()`
    /// chains into its cleanup path. Plain resources close on drop.
    pub(crate) fn release(&mut self) -> SocketResult<()> {
        let Some(resource) = self.resource.take() else {
            return Ok(());
        };
        match resource {
            Resource::ServerTls(stream) => flush_close_notify(stream),
            Resource::ClientTls(stream) => flush_close_notify(stream),
            Resource::Listener { .. } | Resource::Plain(_) => Ok(()),
        }
    }
}

fn flush_close_notify<C, S>(mut stream: StreamOwned<C, TcpStream>) -> SocketResult<()>
where
    C: DerefMut<Target = ConnectionCommon<S>>,
    S: SideData,
{
    stream.conn.send_close_notify();
    while stream.conn.wants_write() {
        match stream.conn.write_tls(&mut stream.sock) {
            Ok(_) => {}
            // best effort on a non-blocking socket
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
            Err(err) => return Err(SocketError::shutdown(&err)),
        }
    }
    Ok(())
}
