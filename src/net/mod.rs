//! Socket lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint (scheme://address:port)
//!     → stream.rs create() (context.rs: staged options, TLS config)
//!     → stream.rs listen() / connect() (handle.rs owns the OS resource)
//!     → accept() → one new Stream per connection
//!     → read()/send() (framing.rs for newline-delimited text)
//!     → shutdown() / close()
//!
//! Lifecycle States:
//!     Unconfigured → ContextCreated → {Listening | Connected} → Closed
//! ```
//!
//! # Design Decisions
//! - Blocking by default; the mode flag lives on the handle and is toggled
//!   explicitly
//! - Non-blocking accept/read report "not ready" as values, never as errors
//! - Accepted streams share nothing with their listener and may outlive it

pub mod context;
pub mod endpoint;
pub mod error;
pub mod framing;
mod handle;
pub mod stream;
pub mod tls;

pub use context::{SocketContext, SocketOption};
pub use endpoint::{Endpoint, Scheme};
pub use error::{SocketError, SocketResult};
pub use framing::LineFramer;
pub use stream::{ReadOutcome, Stream, StreamState};
pub use tls::TlsOptions;
