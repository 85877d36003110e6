//! Metric names and label values

pub const CONNECT_ATTEMPTS: &str = "connector_wire_connect_attempts_total";
pub const CONNECT_FAILURES: &str = "connector_wire_connect_failures_total";
pub const CONNECTIONS_ESTABLISHED: &str = "connector_wire_connections_established_total";
pub const ENDPOINTS_EXHAUSTED: &str = "connector_wire_endpoints_exhausted_total";
pub const PLUGIN_RECONFIGURATIONS: &str = "connector_wire_plugin_reconfigurations_total";
pub const ESTABLISH_DURATION: &str = "connector_wire_establish_duration_ms";

pub const PROTOCOL: &str = "protocol";
pub const KIND: &str = "kind";
pub const TARGET: &str = "target";

/// Retryable, endpoint local failure
pub const FAILURE_NETWORK: &str = "network";
/// Failure that ends failover
pub const FAILURE_FATAL: &str = "fatal";

pub const TARGET_PLUGIN_DEFAULT: &str = "plugin_default";
pub const TARGET_CALLER: &str = "caller";
