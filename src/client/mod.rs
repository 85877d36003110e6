//! High-level client API
//!
//! This module handles:
//! * Connection URI parsing
//! * The driver that turns options into established connections

mod connection_string;
mod driver;

pub use connection_string::{parse_host_list, ConnectionUri};
pub use driver::Driver;
