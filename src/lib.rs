//! Unified TCP/TLS stream socket lifecycle library.

pub mod config;
pub mod net;
pub mod server;

pub use config::schema::AppConfig;
pub use net::error::{SocketError, SocketResult};
pub use net::framing::LineFramer;
pub use net::stream::Stream;
pub use server::{Client, Server, SecureServer};
