//! Core connection type

use super::transport::Transport;
use crate::endpoint::{EndpointDescriptor, Protocol};
use crate::options::ResultSetType;
use crate::{Error, Result};

/// Live connection bound to one endpoint
pub struct Connection<T: Transport> {
    transport: Option<T>,
    endpoint: EndpointDescriptor,
    port: u16,
    user: String,
    schema: Option<String>,
    autocommit: bool,
    reconnect: bool,
    statement_result_type: ResultSetType,
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("schema", &self.schema)
            .field("autocommit", &self.autocommit)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Everything known about the connection once failover succeeded
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub endpoint: EndpointDescriptor,
    pub port: u16,
    pub user: String,
    pub schema: Option<String>,
    pub reconnect: bool,
    pub statement_result_type: ResultSetType,
}

impl<T: Transport> Connection<T> {
    pub(crate) fn new(transport: T, binding: Binding) -> Self {
        Self {
            transport: Some(transport),
            endpoint: binding.endpoint,
            port: binding.port,
            user: binding.user,
            schema: binding.schema,
            autocommit: true,
            reconnect: binding.reconnect,
            statement_result_type: binding.statement_result_type,
        }
    }

    /// Endpoint that accepted the connection
    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    /// `host:port`, socket path or pipe name of the bound endpoint
    pub fn host_info(&self) -> String {
        match self.endpoint.protocol() {
            Protocol::Tcp => format!("{}:{}", self.endpoint.host(), self.port),
            _ => self.endpoint.describe(self.port),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn is_autocommit(&self) -> bool {
        self.autocommit
    }

    /// Whether the transport reconnects on its own after a dropped link
    pub fn reconnect(&self) -> bool {
        self.reconnect
    }

    /// Result set type of statements created on this connection
    pub fn statement_result_type(&self) -> ResultSetType {
        self.statement_result_type
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Underlying transport
    pub fn transport(&self) -> Result<&T> {
        self.transport.as_ref().ok_or_else(closed)
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or_else(closed)
    }

    /// Switch autocommit
    pub async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        self.transport_mut()?.set_autocommit(enabled).await?;
        self.autocommit = enabled;
        Ok(())
    }

    /// Run a statement, discarding any result
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        self.transport_mut()?.execute(sql).await?;
        Ok(())
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<()> {
        let mut transport = self.transport.take().ok_or_else(closed)?;
        transport.close().await;
        tracing::debug!(endpoint = %self.endpoint, "connection closed");
        Ok(())
    }
}

fn closed() -> Error {
    Error::InvalidState {
        expected: "open connection".into(),
        actual: "closed".into(),
    }
}
