//! Connection builders over the socket lifecycle.
//!
//! # Data Flow
//! ```text
//! Server      → create() → listen() → set_block()          → listening Stream
//! SecureServer→ validate cert → create() → enable_ssl()
//!               → listen() → set_block()                   → listening Stream
//! Client      → create() → connect()                       → connected Stream
//! ```
//!
//! # Design Decisions
//! - Builders own configuration only; all state lives in `net::Stream`
//! - Each `start()` is an ordered pipeline; the first failing step propagates
//!   and later steps never run
//! - The scheme is fixed when the builder is chosen, never toggled mid-flight

pub mod client;
pub mod listener;
pub mod secure;

pub use client::Client;
pub use listener::Server;
pub use secure::SecureServer;
