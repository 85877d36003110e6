//! Counters

use super::labels;
use metrics::counter;

/// One connect attempt against one endpoint
pub fn connect_attempt(protocol: &'static str) {
    counter!(labels::CONNECT_ATTEMPTS, labels::PROTOCOL => protocol).increment(1);
}

/// A failed connect attempt, by failure kind
pub fn connect_failure(kind: &'static str) {
    counter!(labels::CONNECT_FAILURES, labels::KIND => kind).increment(1);
}

pub fn connection_established() {
    counter!(labels::CONNECTIONS_ESTABLISHED).increment(1);
}

pub fn endpoints_exhausted() {
    counter!(labels::ENDPOINTS_EXHAUSTED).increment(1);
}

/// Plugin callback target changed under the exclusive lock
pub fn plugin_reconfigured(target: &'static str) {
    counter!(labels::PLUGIN_RECONFIGURATIONS, labels::TARGET => target).increment(1);
}
