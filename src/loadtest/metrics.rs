//! Round-trip latency recording.
//!
//! Every worker owns a [`LatencyRecorder`]; nothing is shared while the run
//! is in progress. The coordinator merges the recorders after all workers
//! have finished. Values are stored in microseconds since localhost round
//! trips are routinely well under a millisecond.

use std::time::Duration;

use hdrhistogram::Histogram;

/// Single-owner latency histogram for one connection.
#[derive(Debug, Clone)]
pub struct LatencyRecorder {
    histogram: Histogram<u64>,
}

/// Latency percentiles in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct LatencySnapshot {
    /// Median round trip.
    pub p50_us: u64,
    /// 95th percentile round trip.
    pub p95_us: u64,
    /// 99th percentile round trip.
    pub p99_us: u64,
    /// Slowest round trip.
    pub max_us: u64,
    /// Mean round trip.
    pub mean_us: f64,
}

impl LatencyRecorder {
    /// Create an empty recorder (3 significant figures, auto-resize).
    pub fn new() -> Self {
        let mut histogram = Histogram::<u64>::new(3).expect("3 sigfigs is always valid");
        histogram.auto(true);
        Self { histogram }
    }

    /// Record one completed round trip.
    pub fn record(&mut self, latency: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let _ = self.histogram.record(us);
    }

    /// Fold another recorder's samples into this one.
    pub fn merge(&mut self, other: &LatencyRecorder) {
        if let Err(e) = self.histogram.add(&other.histogram) {
            tracing::warn!(error = %e, "failed to merge latency histogram");
        }
    }

    /// Number of recorded round trips.
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Current percentiles; all zero when empty.
    pub fn snapshot(&self) -> LatencySnapshot {
        if self.histogram.is_empty() {
            return LatencySnapshot::default();
        }
        LatencySnapshot {
            p50_us: self.histogram.value_at_quantile(0.50),
            p95_us: self.histogram.value_at_quantile(0.95),
            p99_us: self.histogram.value_at_quantile(0.99),
            max_us: self.histogram.max(),
            mean_us: self.histogram.mean(),
        }
    }
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}
