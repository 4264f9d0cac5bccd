//! Socket lifecycle state machine.
//!
//! # Responsibilities
//! - Drive one socket through create → listen/connect → accept/read/send →
//!   shutdown → close
//! - Enforce the blocking and non-blocking accept/read contracts
//! - Tear down bind failures without losing either error
//!
//! # Design Decisions
//! - The lifecycle is runtime-checked; wrong-state calls return typed errors
//!   instead of panicking
//! - Non-blocking "not ready" conditions are values (`Ok(None)` from accept,
//!   `ReadOutcome::NotReady` from read), never errors
//! - `close()` is infallible and idempotent; teardown failures are logged,
//!   while `listen()` cleanup chains them into the returned error

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConnection, ServerConnection, StreamOwned};
use socket2::{Domain, Protocol, SockRef, Socket, Type};

use crate::net::context::{apply_option, SocketContext, SocketOption};
use crate::net::endpoint::{Endpoint, Scheme};
use crate::net::error::{SocketError, SocketResult};
use crate::net::handle::{Handle, Resource};
use crate::net::tls::{self, TlsOptions};

/// Default accept timeout in seconds; values `<= 0` leave accept unbounded.
pub const DEFAULT_ACCEPT_TIMEOUT_SECS: i64 = -1;

/// Bounded retry for transient non-blocking read conditions.
const READ_RETRY_COUNT: u32 = 10;
const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Lifecycle state of a [`Stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No context allocated yet.
    Unconfigured,
    /// `create()` has allocated a connection context.
    ContextCreated,
    /// `listen()` has bound a listening socket.
    Listening,
    /// `connect()` or accept-derivation produced a data stream.
    Connected,
    /// `close()` has released the resource; terminal.
    Closed,
}

/// Outcome of a [`Stream::read`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Up to the requested number of bytes.
    Data(Vec<u8>),
    /// The peer performed an orderly shutdown.
    Eof,
    /// Non-blocking mode only: no data arrived within the bounded retries.
    NotReady,
}

/// One socket and its lifecycle: context, endpoint, resource, mode.
///
/// The scheme is fixed at construction. Listening streams hand out new
/// `Stream` instances from `accept()`; an accepted stream shares nothing with
/// its listener and may outlive it.
#[derive(Debug)]
pub struct Stream {
    state: StreamState,
    endpoint: Endpoint,
    context: Option<SocketContext>,
    handle: Handle,
}

impl Stream {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            state: StreamState::Unconfigured,
            endpoint: Endpoint::new(scheme),
            context: None,
            handle: Handle::new(),
        }
    }

    /// Wrap an accepted resource in a connected stream.
    ///
    /// The endpoint records the peer address; the blocking flag starts true
    /// because accepted sockets are put into blocking mode explicitly.
    fn accepted(scheme: Scheme, peer: SocketAddr, resource: Resource) -> Self {
        let mut endpoint = Endpoint::new(scheme);
        endpoint.set_address(peer.ip().to_string());
        endpoint.set_port(peer.port());
        let mut handle = Handle::new();
        handle.set(resource);
        Self {
            state: StreamState::Connected,
            endpoint,
            context: None,
            handle,
        }
    }

    /// Allocate a fresh connection context.
    ///
    /// Legal from any state, including `Closed`. A live resource is not
    /// touched; it stays owned until `listen()` replaces it or `close()`
    /// releases it.
    pub fn create(&mut self) -> SocketResult<()> {
        self.context = Some(SocketContext::new());
        self.state = StreamState::ContextCreated;
        tracing::debug!(target = %self.endpoint.target(), "Connection context created");
        Ok(())
    }

    /// Inject TLS options into the context and build the server configuration.
    ///
    /// Requires an `ssl` endpoint and an allocated context. The certificate
    /// file is parsed here, so malformed content fails before any bind.
    pub fn enable_ssl(&mut self, options: TlsOptions) -> SocketResult<()> {
        if self.endpoint.scheme() != Scheme::Ssl {
            return Err(SocketError::Certificate(
                "endpoint scheme is tcp; TLS options require an ssl endpoint".into(),
            ));
        }
        let Some(context) = self.context.as_mut() else {
            return Err(SocketError::Certificate(
                "no connection context; call create() first".into(),
            ));
        };
        let config = tls::build_server_config(&options)?;
        context.set_tls(options, config);
        tracing::debug!(target = %self.endpoint.target(), "TLS options injected into context");
        Ok(())
    }

    /// Open an outbound connection to `scheme://address:port`.
    ///
    /// For `ssl` the TCP stream is wrapped in a TLS client session that skips
    /// peer verification; the handshake completes during subsequent I/O. On
    /// failure the handle remains unset.
    pub fn connect(&mut self) -> SocketResult<()> {
        let target = self.endpoint.target();
        if self.context.is_none() {
            return Err(SocketError::connection_msg(
                &target,
                "no connection context; call create() first",
            ));
        }

        let addr = self
            .endpoint
            .resolve()
            .map_err(|err| SocketError::connection(&target, &err))?;
        let tcp =
            TcpStream::connect(addr).map_err(|err| SocketError::connection(&target, &err))?;

        if let Some(context) = &self.context {
            for option in context.staged() {
                apply_option(option, &SockRef::from(&tcp))
                    .map_err(|err| SocketError::option(option.name(), &err))?;
            }
        }

        let resource = match self.endpoint.scheme() {
            Scheme::Tcp => Resource::Plain(tcp),
            Scheme::Ssl => {
                let server_name = ServerName::try_from(self.endpoint.address().to_string())
                    .map_err(|err| {
                        SocketError::connection_msg(
                            &target,
                            format!("invalid TLS server name: {err}"),
                        )
                    })?;
                let session = ClientConnection::new(tls::build_client_config(), server_name)
                    .map_err(|err| {
                        SocketError::connection_msg(
                            &target,
                            format!("TLS session setup failed: {err}"),
                        )
                    })?;
                Resource::ClientTls(StreamOwned::new(session, tcp))
            }
        };

        if self.handle.is_set() {
            if let Err(err) = self.handle.release() {
                tracing::warn!(error = %err, "Failed to release previous socket resource");
            }
        }
        self.handle.set(resource);
        self.state = StreamState::Connected;
        tracing::info!(target = %target, "Connected");
        Ok(())
    }

    /// Bind and listen on `scheme://address:port` with the configured backlog.
    ///
    /// On failure any held resource is released first; if that release fails
    /// too, the teardown error rides along as the source of the returned
    /// listen error. The bind failure itself is never swallowed.
    pub fn listen(&mut self) -> SocketResult<()> {
        let target = self.endpoint.target();
        let Some(context) = &self.context else {
            return Err(SocketError::listen_msg(
                &target,
                "no connection context; call create() first",
            ));
        };

        let tls = match self.endpoint.scheme() {
            Scheme::Ssl => match context.tls_server() {
                Some(config) => Some(config.clone()),
                None => {
                    return Err(SocketError::listen_msg(
                        &target,
                        "ssl endpoint has no TLS configuration; inject certificate options first",
                    ))
                }
            },
            Scheme::Tcp => None,
        };

        let listener = match self.bind_listener(&target) {
            Ok(listener) => listener,
            Err(bind_err) => {
                // cleanup must not eat the bind failure; a teardown failure
                // rides along as the source instead
                return Err(match self.handle.release() {
                    Ok(()) => bind_err,
                    Err(cleanup) => bind_err.with_cleanup(cleanup),
                });
            }
        };

        if self.handle.is_set() {
            if let Err(err) = self.handle.release() {
                tracing::warn!(error = %err, "Failed to release previous socket resource");
            }
        }
        self.handle.set(Resource::Listener { listener, tls });
        self.state = StreamState::Listening;
        tracing::info!(
            target = %target,
            backlog = self.endpoint.backlog(),
            "Listening"
        );
        Ok(())
    }

    fn bind_listener(&self, target: &str) -> SocketResult<TcpListener> {
        let addr = self
            .endpoint
            .resolve()
            .map_err(|err| SocketError::listen(target, &err))?;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|err| SocketError::listen(target, &err))?;

        // listeners always get address reuse; staged options may override it
        socket
            .set_reuse_address(true)
            .map_err(|err| SocketError::listen(target, &err))?;
        if let Some(context) = &self.context {
            for option in context.staged() {
                if let Err(err) = apply_option(option, &socket) {
                    return Err(SocketError::Listen {
                        target: target.to_string(),
                        message: format!("failed to apply {}: {}", option.name(), err),
                        code: err.raw_os_error(),
                        cleanup: None,
                    });
                }
            }
        }

        // the accept timeout is a receive timeout on the listening socket
        let timeout = self.handle.accept_timeout_secs();
        if timeout > 0 {
            socket
                .set_read_timeout(Some(Duration::from_secs(timeout as u64)))
                .map_err(|err| SocketError::listen(target, &err))?;
        }

        socket
            .bind(&addr.into())
            .map_err(|err| SocketError::listen(target, &err))?;
        socket
            .listen(self.endpoint.backlog())
            .map_err(|err| SocketError::listen(target, &err))?;
        Ok(socket.into())
    }

    /// Accept one pending connection.
    ///
    /// Returns `Ok(Some(stream))` with a freshly derived connected stream, or
    /// `Ok(None)` when non-blocking and nothing is pending. In blocking mode
    /// "nothing pending" cannot be observed: the call blocks, and an expired
    /// accept timeout is an error. For `ssl` listeners the accepted stream
    /// carries a TLS server session whose handshake completes during
    /// subsequent I/O.
    pub fn accept(&mut self) -> SocketResult<Option<Stream>> {
        match self.state {
            StreamState::Listening => {}
            StreamState::Closed => return Err(SocketError::Closed),
            _ => return Err(SocketError::accept_msg("socket is not listening")),
        }
        let blocking = self.handle.is_blocking();
        let (listener, tls) = match self.handle.resource()? {
            Resource::Listener { listener, tls } => (listener, tls.clone()),
            _ => return Err(SocketError::accept_msg("held resource is not a listening socket")),
        };

        match listener.accept() {
            Ok((tcp, peer)) => {
                // accepted sockets always start out blocking, whatever the
                // listener's flag says
                tcp.set_nonblocking(false)
                    .map_err(|err| SocketError::accept(&err))?;
                let resource = match &tls {
                    None => Resource::Plain(tcp),
                    Some(config) => {
                        let session = ServerConnection::new(config.clone()).map_err(|err| {
                            SocketError::accept_msg(format!("TLS session setup failed: {err}"))
                        })?;
                        Resource::ServerTls(StreamOwned::new(session, tcp))
                    }
                };
                tracing::debug!(peer = %peer, "Connection accepted");
                Ok(Some(Stream::accepted(self.endpoint.scheme(), peer, resource)))
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock && !blocking => Ok(None),
            Err(err) => Err(SocketError::accept(&err)),
        }
    }

    /// Read up to `length` bytes.
    ///
    /// Blocking mode blocks natively in the OS; an expired receive timeout is
    /// an error. Non-blocking mode retries a transient would-block condition
    /// a bounded number of times with a delay, then reports
    /// [`ReadOutcome::NotReady`]. Never spins.
    pub fn read(&mut self, length: usize) -> SocketResult<ReadOutcome> {
        if matches!(self.state, StreamState::Closed) {
            return Err(SocketError::Closed);
        }
        if length == 0 {
            // a zero-byte read is indistinguishable from EOF at the OS level
            return Ok(ReadOutcome::Data(Vec::new()));
        }
        let blocking = self.handle.is_blocking();
        let mut buf = vec![0u8; length];
        let mut attempts = 0u32;
        loop {
            match self.handle.resource_mut()?.read(&mut buf) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(ReadOutcome::Data(buf));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if blocking {
                        // a receive timeout expired; blocking reads never
                        // report "not ready"
                        return Err(SocketError::read(&err));
                    }
                    attempts += 1;
                    if attempts >= READ_RETRY_COUNT {
                        return Ok(ReadOutcome::NotReady);
                    }
                    thread::sleep(READ_RETRY_DELAY);
                }
                Err(err) => return Err(SocketError::read(&err)),
            }
        }
    }

    /// Write the bytes in one logical call.
    ///
    /// Returns the number of bytes the OS accepted; short writes are not
    /// retried internally.
    pub fn send(&mut self, data: &[u8]) -> SocketResult<usize> {
        if matches!(self.state, StreamState::Closed) {
            return Err(SocketError::Closed);
        }
        let written = self
            .handle
            .resource_mut()?
            .write(data)
            .map_err(|err| SocketError::write(&err))?;
        if written < data.len() {
            tracing::debug!(requested = data.len(), written, "Short write");
        }
        Ok(written)
    }

    /// Half or full-duplex shutdown of the live resource.
    ///
    /// A no-op when the handle is unset. Does not unset the handle.
    pub fn shutdown(&self, how: Shutdown) -> SocketResult<()> {
        let Ok(resource) = self.handle.resource() else {
            return Ok(());
        };
        resource
            .sock_ref()
            .shutdown(how)
            .map_err(|err| SocketError::shutdown(&err))
    }

    /// Release the resource unconditionally.
    ///
    /// Idempotent and infallible: teardown failures are logged, never
    /// returned. After `close()` the stream is terminal; only `create()`
    /// starts a new lifecycle on it.
    pub fn close(&mut self) {
        if let Err(err) = self.handle.release() {
            tracing::warn!(error = %err, "Socket teardown failed during close");
        }
        self.context = None;
        self.state = StreamState::Closed;
    }

    /// Switch the live resource to blocking mode.
    pub fn set_block(&mut self) -> SocketResult<()> {
        self.apply_mode(true)
    }

    /// Switch the live resource to non-blocking mode.
    pub fn set_no_block(&mut self) -> SocketResult<()> {
        self.apply_mode(false)
    }

    fn apply_mode(&mut self, blocking: bool) -> SocketResult<()> {
        let resource = self.handle.resource()?;
        resource
            .sock_ref()
            .set_nonblocking(!blocking)
            .map_err(|err| SocketError::mode(blocking, &err))?;
        // the flag only moves once the OS call succeeded
        self.handle.set_blocking_flag(blocking);
        tracing::debug!(blocking, "Blocking mode updated");
        Ok(())
    }

    /// Apply a typed socket option.
    ///
    /// With a live resource the option is applied immediately; otherwise it
    /// is staged in the context and applied at bind/connect time. Failures
    /// always surface.
    pub fn set_option(&mut self, option: SocketOption) -> SocketResult<()> {
        if self.handle.is_set() {
            let resource = self.handle.resource()?;
            apply_option(&option, &resource.sock_ref())
                .map_err(|err| SocketError::option(option.name(), &err))?;
            tracing::debug!(option = option.name(), "Socket option applied");
            Ok(())
        } else if let Some(context) = self.context.as_mut() {
            tracing::debug!(option = option.name(), "Socket option staged");
            context.stage(option);
            Ok(())
        } else {
            Err(SocketError::SetOption {
                name: option.name(),
                message: "no connection context and no live resource".into(),
                code: None,
            })
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn scheme(&self) -> Scheme {
        self.endpoint.scheme()
    }

    pub fn address(&self) -> &str {
        self.endpoint.address()
    }

    pub fn port(&self) -> u16 {
        self.endpoint.port()
    }

    pub fn backlog(&self) -> i32 {
        self.endpoint.backlog()
    }

    /// The `"<scheme>://<address>:<port>"` listen target.
    pub fn target(&self) -> String {
        self.endpoint.target()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_set()
    }

    pub fn is_blocking(&self) -> bool {
        self.handle.is_blocking()
    }

    pub fn accept_timeout(&self) -> i64 {
        self.handle.accept_timeout_secs()
    }

    /// Set the bind address; effective for the next `listen()`/`connect()`.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.endpoint.set_address(address);
    }

    /// Set the port; effective for the next `listen()`/`connect()`.
    pub fn set_port(&mut self, port: u16) {
        self.endpoint.set_port(port);
    }

    /// Set the accept backlog; effective for the next `listen()`.
    pub fn set_backlog(&mut self, backlog: i32) {
        self.endpoint.set_backlog(backlog);
    }

    /// Set the accept timeout in seconds; values `<= 0` leave accept
    /// unbounded. Effective for the next `listen()`.
    pub fn set_accept_timeout(&mut self, secs: i64) {
        self.handle.set_accept_timeout_secs(secs);
    }

    /// Local address of the live resource.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self.handle.resource() {
            Ok(resource) => resource.local_addr(),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no live socket resource",
            )),
        }
    }

    /// Peer address of the live resource.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self.handle.resource() {
            Ok(resource) => resource.peer_addr(),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no live socket resource",
            )),
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new(Scheme::Tcp)
    }
}
