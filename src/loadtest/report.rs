//! JSON report for machine consumption.
//!
//! Schema-versioned and self-contained: the resolved run configuration is
//! embedded next to the results so a report can be reproduced from itself.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::loadtest::metrics::LatencySnapshot;
use crate::loadtest::summary::BenchmarkSummary;

/// Schema version for the JSON report format.
///
/// Increment when making breaking changes to the report structure.
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON report.
#[derive(Debug, Serialize)]
pub struct BenchmarkReport {
    /// Report format version.
    pub schema_version: String,
    /// RFC 3339 timestamp when the report was generated.
    pub timestamp: String,
    /// Resolved run configuration.
    pub config: ReportConfig,
    /// Aggregate results.
    pub results: ReportResults,
}

/// Run configuration as embedded in the report.
#[derive(Debug, Serialize)]
pub struct ReportConfig {
    pub host: String,
    pub port: u16,
    pub connections: u32,
    pub duration_secs: f64,
    pub timeout_secs: f64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub max_line_bytes: usize,
}

/// Aggregate results as embedded in the report.
#[derive(Debug, Serialize)]
pub struct ReportResults {
    /// Connections attempted.
    pub connections: u32,
    /// Total responses received.
    pub responses: u64,
    /// Workers that ended on a response timeout.
    pub timeouts: u64,
    /// Wall-clock time in seconds.
    pub elapsed_secs: f64,
    /// Responses per second.
    pub rps: f64,
    /// Worker-ending errors by category.
    pub errors: BTreeMap<String, u64>,
    /// Round-trip latency percentiles.
    pub latency: LatencySnapshot,
}

impl BenchmarkReport {
    /// Build a report from a summary and the config embedded in it.
    pub fn from_summary(summary: &BenchmarkSummary) -> Self {
        let config = &summary.config;
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            config: ReportConfig {
                host: config.host.clone(),
                port: config.port,
                connections: config.connections,
                duration_secs: config.duration.as_secs_f64(),
                timeout_secs: config.timeout.as_secs_f64(),
                method: config.method.clone(),
                params: config.params.clone(),
                max_line_bytes: config.max_line_bytes,
            },
            results: ReportResults {
                connections: summary.connections,
                responses: summary.total_responses,
                timeouts: summary.timeouts,
                elapsed_secs: summary.elapsed_secs(),
                rps: summary.rate,
                errors: summary
                    .errors
                    .iter()
                    .map(|(category, count)| (category.to_string(), *count))
                    .collect(),
                latency: summary.latency,
            },
        }
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
