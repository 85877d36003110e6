//! connector-wire: connection configuration and establishment for
//! MySQL-protocol clients
//!
//! The crate turns a loosely typed set of named options (built in code, from
//! JSON, or from a `mysql://` URI) into a connection over one of several
//! candidate endpoints:
//!
//! * Options are type-checked as they are set, then validated as a whole
//!   into an application plan
//! * The plan is applied to a [`connection::Transport`], the seam behind
//!   which the native client session lives
//! * Authentication plugin options are applied under a process wide
//!   reader/writer guard, so concurrent attempts never observe each other's
//!   half applied plugin configuration
//! * Endpoints are picked uniformly at random without replacement; network
//!   failures fail over, anything else aborts. Priorities are kept as
//!   endpoint metadata and only honored by the opt in
//!   [`endpoint::PrioritySelector`]
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> connector_wire::Result<()> {
//! use connector_wire::client::Driver;
//! use connector_wire::options::{names, ConnectOptions};
//! use connector_wire::plugin::PluginConfigGuard;
//! use connector_wire::testing::ScriptedTransport;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let guard = Arc::new(PluginConfigGuard::new());
//! let driver = Driver::new(guard);
//!
//! let opts = ConnectOptions::new()
//!     .set(names::USER_NAME, "app")?
//!     .set(names::MULTI_HOST, true)?
//!     .set(names::CONNECT_TIMEOUT, Duration::from_secs(2))?
//!     .host("db1.internal", Some(3306))
//!     .priority(90)?
//!     .host("db2.internal", Some(3306))
//!     .priority(10)?;
//!
//! let conn = driver.connect(ScriptedTransport::new(), &opts).await?;
//! println!("connected to {}", conn.host_info());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod options;
pub mod plugin;
pub mod protocol;
pub mod testing;

pub use client::{ConnectionUri, Driver};
pub use connection::Connection;
pub use error::{Error, NativeError, Result};
pub use options::ConnectOptions;
