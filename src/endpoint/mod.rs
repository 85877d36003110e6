//! Candidate endpoints
//!
//! This module handles:
//! * Endpoint descriptors (TCP host, unix socket, named pipe)
//! * The endpoint set consumed by one establishment attempt
//! * Randomized, priority aware endpoint selection
//! * The failover loop and its exhaustion message

mod failover;
mod select;

pub use failover::{exhaustion_error, Failover};
pub use select::{PrioritySelector, RandomSelector, Selector, SequenceSelector};

use crate::options::MAX_PRIORITY;
use crate::{Error, Result};
use std::fmt;

/// Endpoint transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP host and port
    Tcp,
    /// Unix domain socket
    Socket,
    /// Windows named pipe
    Pipe,
}

impl Protocol {
    /// Short name used in logs and metric labels
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Socket => "socket",
            Self::Pipe => "pipe",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate server address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointDescriptor {
    protocol: Protocol,
    host: String,
    port: Option<u16>,
    path: Option<String>,
    priority: Option<u16>,
    weight: u32,
}

impl EndpointDescriptor {
    /// TCP endpoint; a `None` port means the set's default port
    pub fn tcp(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            protocol: Protocol::Tcp,
            host: host.into(),
            port,
            path: None,
            priority: None,
            weight: 1,
        }
    }

    /// Unix socket endpoint
    pub fn socket(path: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Socket,
            host: String::new(),
            port: None,
            path: Some(path.into()),
            priority: None,
            weight: 1,
        }
    }

    /// Named pipe endpoint
    pub fn pipe(name: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Pipe,
            host: String::new(),
            port: None,
            path: Some(name.into()),
            priority: None,
            weight: 1,
        }
    }

    /// Set the priority (0-100, higher is tried first by [`PrioritySelector`])
    pub fn with_priority(mut self, priority: Option<u16>) -> Self {
        self.priority = priority;
        self
    }

    /// Set the relative weight inside a priority tier
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Host name; empty for socket and pipe endpoints
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if any
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Port to connect to, falling back to `default_port`
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }

    /// Socket path or pipe name
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn priority(&self) -> Option<u16> {
        self.priority
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Whether an explicit port was given
    pub fn has_port(&self) -> bool {
        self.port.is_some()
    }

    /// Check that protocol, host, port and path agree
    pub fn validate(&self) -> Result<()> {
        match self.protocol {
            Protocol::Tcp => {
                if self.host.is_empty() {
                    return Err(Error::invalid("TCP endpoint requires a host"));
                }
                if self.path.is_some() {
                    return Err(Error::invalid(format!(
                        "endpoint {} cannot combine a host with a socket path",
                        self.host
                    )));
                }
            }
            Protocol::Socket | Protocol::Pipe => {
                if self.path.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::invalid(format!(
                        "{} endpoint requires a path",
                        self.protocol
                    )));
                }
                if !self.host.is_empty() || self.port.is_some() {
                    return Err(Error::invalid(format!(
                        "{} endpoint cannot carry a host or port",
                        self.protocol
                    )));
                }
            }
        }
        if let Some(p) = self.priority {
            if p > MAX_PRIORITY {
                return Err(Error::invalid(format!(
                    "priority {} out of range, expected 0-{}",
                    p, MAX_PRIORITY
                )));
            }
        }
        Ok(())
    }

    /// Human readable target, with the default port filled in
    pub fn describe(&self, default_port: u16) -> String {
        match self.protocol {
            Protocol::Tcp => format!("{}:{}", self.host, self.port_or(default_port)),
            Protocol::Socket | Protocol::Pipe => self.path.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.protocol, self.port) {
            (Protocol::Tcp, Some(port)) => write!(f, "{}:{}", self.host, port),
            (Protocol::Tcp, None) => f.write_str(&self.host),
            _ => f.write_str(self.path.as_deref().unwrap_or_default()),
        }
    }
}

/// Endpoints of one establishment attempt
///
/// Built once from options, then only shrunk by the failover loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSet {
    endpoints: Vec<EndpointDescriptor>,
    default_port: u16,
    schema: Option<String>,
}

impl EndpointSet {
    pub fn new(
        endpoints: Vec<EndpointDescriptor>,
        default_port: u16,
        schema: Option<String>,
    ) -> Self {
        Self {
            endpoints,
            default_port,
            schema,
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    /// Schema shared by every endpoint
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.iter()
    }

    pub fn as_slice(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Remove and return the endpoint at `index`
    pub fn take(&mut self, index: usize) -> Option<EndpointDescriptor> {
        (index < self.endpoints.len()).then(|| self.endpoints.remove(index))
    }

    /// Whether any endpoint carries an explicit priority
    pub fn is_prioritized(&self) -> bool {
        self.endpoints.iter().any(|e| e.priority.is_some())
    }
}
