//! Connection establishment metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder every
//! call is a no-op.

pub mod counters;
pub mod histograms;
pub mod labels;
