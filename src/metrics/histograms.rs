//! Histograms

use super::labels;
use metrics::histogram;
use std::time::Duration;

/// Wall time of one establishment attempt, including every endpoint tried
pub fn establish_duration(elapsed: Duration) {
    histogram!(labels::ESTABLISH_DURATION).record(elapsed.as_secs_f64() * 1000.0);
}
