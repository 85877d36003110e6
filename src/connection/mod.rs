//! Connection management
//!
//! This module handles:
//! * Transport abstraction (options, connect primitive, session calls)
//! * Establishment across endpoints with failover
//! * State machine enforcement
//! * TLS settings

mod conn;
mod establish;
mod state;
mod tls;
mod transport;

pub use conn::Connection;
pub use establish::Establisher;
pub use state::EstablishState;
pub use tls::{SslMaterial, SslMode};
pub use transport::{ConnectTarget, OptionRejected, Transport};
