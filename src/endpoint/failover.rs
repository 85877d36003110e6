//! Failover bookkeeping
//!
//! [`Failover`] owns the endpoint set of one establishment attempt. The caller
//! asks for the next endpoint, tries it, and reports failures back; network
//! failures move on, anything else ends the loop.

use super::{EndpointDescriptor, EndpointSet, Protocol, Selector};
use crate::error::NativeError;
use crate::metrics::{counters, labels};
use crate::{Error, Result};

/// Failover state for one establishment attempt
pub struct Failover<'s> {
    set: EndpointSet,
    selector: &'s mut dyn Selector,
    initial: Vec<EndpointDescriptor>,
    attempted: usize,
    last_error: Option<NativeError>,
}

impl<'s> Failover<'s> {
    pub fn new(set: EndpointSet, selector: &'s mut dyn Selector) -> Self {
        let initial = set.as_slice().to_vec();
        Self {
            set,
            selector,
            initial,
            attempted: 0,
            last_error: None,
        }
    }

    /// Remove and return the next endpoint to try
    pub fn next_endpoint(&mut self) -> Option<EndpointDescriptor> {
        if self.set.is_empty() {
            return None;
        }
        let index = self.selector.pick(self.set.as_slice()).min(self.set.len() - 1);
        let endpoint = self.set.take(index)?;
        self.attempted += 1;
        counters::connect_attempt(endpoint.protocol().as_str());
        Some(endpoint)
    }

    /// Record a failed attempt.
    ///
    /// Returns `Ok(())` when failover should continue, or the error to surface
    /// when the failure is not network related.
    pub fn record_failure(&mut self, endpoint: &EndpointDescriptor, err: NativeError) -> Result<()> {
        if !err.is_network() {
            counters::connect_failure(labels::FAILURE_FATAL);
            tracing::warn!(
                endpoint = %endpoint,
                code = err.code,
                sqlstate = %err.sqlstate,
                "fatal connect error, skipping remaining endpoints"
            );
            return Err(Error::FatalConnect(err));
        }

        counters::connect_failure(labels::FAILURE_NETWORK);
        tracing::debug!(
            endpoint = %endpoint,
            code = err.code,
            sqlstate = %err.sqlstate,
            remaining = self.set.len(),
            "endpoint unreachable, trying next"
        );
        self.last_error = Some(err);
        Ok(())
    }

    /// Endpoints still to be tried
    pub fn remaining(&self) -> usize {
        self.set.len()
    }

    /// Endpoints tried so far
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn default_port(&self) -> u16 {
        self.set.default_port()
    }

    /// Error for an exhausted set
    pub fn into_error(self, dns_srv: bool) -> Error {
        counters::endpoints_exhausted();
        exhaustion_error(
            &self.initial,
            self.set.default_port(),
            dns_srv,
            self.attempted,
            self.last_error,
        )
    }
}

/// Build the error raised once every endpoint has failed.
///
/// The message depends on the configured endpoints, not on how many are left.
pub fn exhaustion_error(
    configured: &[EndpointDescriptor],
    default_port: u16,
    dns_srv: bool,
    attempted: usize,
    last_error: Option<NativeError>,
) -> Error {
    let message = match configured {
        [] => "No endpoints configured".to_string(),
        [srv] if dns_srv => format!("Unable to connect to any of the hosts of {} SRV", srv.host()),
        [single] => match single.protocol() {
            Protocol::Tcp => format!(
                "Unable to connect to {}:{}",
                single.host(),
                single.port_or(default_port)
            ),
            Protocol::Socket | Protocol::Pipe => {
                format!("Unable to connect to {}", single.describe(default_port))
            }
        },
        _ => "Unable to connect to any of the hosts".to_string(),
    };

    let (code, sqlstate) = last_error
        .map(|e| (e.code, e.sqlstate))
        .unwrap_or((crate::protocol::constants::codes::CR_CONN_HOST_ERROR, "HY000".to_string()));

    Error::ExhaustedEndpoints {
        message,
        code,
        sqlstate,
        attempted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::SequenceSelector;

    fn set(endpoints: Vec<EndpointDescriptor>) -> EndpointSet {
        EndpointSet::new(endpoints, 3306, None)
    }

    fn unreachable() -> NativeError {
        NativeError::new(2003, "HY000", "Can't connect")
    }

    #[test]
    fn test_network_failures_continue() {
        let mut selector = SequenceSelector::in_order();
        let mut failover = Failover::new(
            set(vec![
                EndpointDescriptor::tcp("a", None),
                EndpointDescriptor::tcp("b", None),
            ]),
            &mut selector,
        );
        let a = failover.next_endpoint().unwrap();
        failover.record_failure(&a, unreachable()).unwrap();
        let b = failover.next_endpoint().unwrap();
        failover.record_failure(&b, unreachable()).unwrap();
        assert!(failover.next_endpoint().is_none());

        let err = failover.into_error(false);
        match err {
            Error::ExhaustedEndpoints {
                message,
                code,
                attempted,
                ..
            } => {
                assert_eq!(message, "Unable to connect to any of the hosts");
                assert_eq!(code, 2003);
                assert_eq!(attempted, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fatal_failure_stops() {
        let mut selector = SequenceSelector::in_order();
        let mut failover = Failover::new(
            set(vec![
                EndpointDescriptor::tcp("a", None),
                EndpointDescriptor::tcp("b", None),
            ]),
            &mut selector,
        );
        let a = failover.next_endpoint().unwrap();
        let err = failover
            .record_failure(&a, NativeError::new(1045, "28000", "Access denied"))
            .unwrap_err();
        assert!(matches!(err, Error::FatalConnect(_)));
        assert_eq!(failover.remaining(), 1);
    }

    #[test]
    fn test_out_of_range_pick_is_clamped() {
        struct Wild;
        impl Selector for Wild {
            fn pick(&mut self, _: &[EndpointDescriptor]) -> usize {
                99
            }
        }
        let mut selector = Wild;
        let mut failover = Failover::new(
            set(vec![
                EndpointDescriptor::tcp("a", None),
                EndpointDescriptor::tcp("b", None),
            ]),
            &mut selector,
        );
        assert_eq!(failover.next_endpoint().unwrap().host(), "b");
    }

    #[test]
    fn test_single_endpoint_messages() {
        let err = exhaustion_error(
            &[EndpointDescriptor::tcp("db", None)],
            3307,
            false,
            1,
            Some(unreachable()),
        );
        assert_eq!(err.to_string(), "Unable to connect to db:3307");

        let err = exhaustion_error(
            &[EndpointDescriptor::socket("/tmp/mysql.sock")],
            3306,
            false,
            1,
            None,
        );
        assert_eq!(err.to_string(), "Unable to connect to /tmp/mysql.sock");
    }

    #[test]
    fn test_srv_message() {
        let err = exhaustion_error(
            &[EndpointDescriptor::tcp("_mysql._tcp.example.com", None)],
            3306,
            true,
            1,
            None,
        );
        assert_eq!(
            err.to_string(),
            "Unable to connect to any of the hosts of _mysql._tcp.example.com SRV"
        );
    }

    #[test]
    fn test_empty_message() {
        let err = exhaustion_error(&[], 3306, false, 0, None);
        assert_eq!(err.to_string(), "No endpoints configured");
    }
}
