//! Transport abstraction
//!
//! The wire protocol lives behind [`Transport`]: a typed option setter, a
//! connect primitive reporting native errors, and the few session calls made
//! right after connecting.

use crate::endpoint::Protocol;
use crate::error::NativeError;
use crate::options::{NativeOption, SettingValue};
use crate::plugin::PluginValue;
use async_trait::async_trait;
use std::fmt;

use super::SslMaterial;

/// Why the transport refused an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionRejected {
    /// Not available in this build or client version
    NotImplemented,
    /// Available, but the value was refused
    Invalid(String),
}

impl fmt::Display for OptionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImplemented => write!(f, "option not implemented"),
            Self::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

/// Arguments of one connect call
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Host name (TCP only)
    pub host: Option<String>,
    pub user: String,
    pub password: Option<String>,
    pub schema: Option<String>,
    /// Port (TCP only; 0 for socket and pipe)
    pub port: u16,
    /// Socket path or pipe name
    pub socket: Option<String>,
    /// Client capability flags
    pub flags: u64,
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("schema", &self.schema)
            .field("port", &self.port)
            .field("socket", &self.socket)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Native client session
///
/// One transport backs one connection. Option setters are synchronous; only
/// calls that talk to the server are `async`.
#[async_trait]
pub trait Transport: Send {
    /// Linked client library version (e.g. 80033)
    fn client_version(&self) -> u32;

    /// Typed option setter
    fn set_option(
        &mut self,
        option: NativeOption,
        value: &SettingValue,
    ) -> Result<(), OptionRejected>;

    /// TLS certificate material
    fn set_ssl(&mut self, material: &SslMaterial) -> Result<(), OptionRejected>;

    /// Authentication plugin option
    fn plugin_option(
        &mut self,
        plugin: &str,
        option: &str,
        value: &PluginValue,
    ) -> Result<(), OptionRejected>;

    /// Select the protocol of the next connect call
    fn use_protocol(&mut self, protocol: Protocol) -> Result<(), OptionRejected>;

    /// Connect to one endpoint
    async fn connect(&mut self, target: &ConnectTarget) -> Result<(), NativeError>;

    /// Resolve `srv_name` through DNS SRV and connect to one of its records
    async fn connect_dns_srv(
        &mut self,
        srv_name: &str,
        target: &ConnectTarget,
    ) -> Result<(), NativeError>;

    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeError>;

    /// Run a statement, discarding any result
    async fn execute(&mut self, sql: &str) -> Result<(), NativeError>;

    /// Drop partially applied state after a failed establishment
    fn reset(&mut self);

    /// Close the session
    async fn close(&mut self);
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn client_version(&self) -> u32 {
        (**self).client_version()
    }

    fn set_option(
        &mut self,
        option: NativeOption,
        value: &SettingValue,
    ) -> Result<(), OptionRejected> {
        (**self).set_option(option, value)
    }

    fn set_ssl(&mut self, material: &SslMaterial) -> Result<(), OptionRejected> {
        (**self).set_ssl(material)
    }

    fn plugin_option(
        &mut self,
        plugin: &str,
        option: &str,
        value: &PluginValue,
    ) -> Result<(), OptionRejected> {
        (**self).plugin_option(plugin, option, value)
    }

    fn use_protocol(&mut self, protocol: Protocol) -> Result<(), OptionRejected> {
        (**self).use_protocol(protocol)
    }

    async fn connect(&mut self, target: &ConnectTarget) -> Result<(), NativeError> {
        (**self).connect(target).await
    }

    async fn connect_dns_srv(
        &mut self,
        srv_name: &str,
        target: &ConnectTarget,
    ) -> Result<(), NativeError> {
        (**self).connect_dns_srv(srv_name, target).await
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeError> {
        (**self).set_autocommit(enabled).await
    }

    async fn execute(&mut self, sql: &str) -> Result<(), NativeError> {
        (**self).execute(sql).await
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    async fn close(&mut self) {
        (**self).close().await
    }
}
