//! Benchmark summary: aggregation and terminal rendering.
//!
//! [`BenchmarkSummary::aggregate`] is a pure reduction over the collected
//! [`WorkerResult`]s. The renderers are pure functions too: they take a
//! summary and return a [`String`], leaving the choice of destination to
//! the caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use crate::loadtest::config::RunConfig;
use crate::loadtest::metrics::{LatencyRecorder, LatencySnapshot};
use crate::loadtest::worker::{StopReason, WorkerResult};

/// Width for dotted metric row padding.
const PAD_WIDTH: usize = 32;

/// Aggregate outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    /// Validated configuration the run used.
    pub config: Arc<RunConfig>,
    /// Connections attempted (one worker each).
    pub connections: u32,
    /// Sum of every worker's response count.
    pub total_responses: u64,
    /// Wall-clock time from start to the last worker finishing.
    pub elapsed: Duration,
    /// Responses per second; 0 when `elapsed` is zero.
    pub rate: f64,
    /// Workers that ended waiting on a response.
    pub timeouts: u64,
    /// Workers that ended on any error, keyed by category.
    pub errors: BTreeMap<&'static str, u64>,
    /// Round-trip latency across all connections.
    pub latency: LatencySnapshot,
}

impl BenchmarkSummary {
    /// Reduce per-worker results into a summary.
    pub fn aggregate(config: Arc<RunConfig>, results: &[WorkerResult], elapsed: Duration) -> Self {
        let total_responses: u64 = results.iter().map(|r| r.responses).sum();

        let mut errors = BTreeMap::new();
        let mut timeouts = 0;
        let mut latency = LatencyRecorder::new();
        for result in results {
            match &result.stop {
                StopReason::Failed(err) => {
                    *errors.entry(err.category()).or_insert(0) += 1;
                    if err.is_timeout() {
                        timeouts += 1;
                    }
                },
                StopReason::Aborted => *errors.entry("aborted").or_insert(0) += 1,
                StopReason::Deadline | StopReason::Shutdown => {},
            }
            latency.merge(&result.latency);
        }

        Self {
            connections: config.connections,
            config,
            total_responses,
            elapsed,
            rate: compute_rate(total_responses, elapsed),
            timeouts,
            errors,
            latency: latency.snapshot(),
        }
    }

    /// Elapsed time in fractional seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Responses per second, guarding against a zero elapsed time.
pub fn compute_rate(total: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        total as f64 / secs
    } else {
        0.0
    }
}

/// Render the plain `key=value` result lines.
///
/// ```text
/// connections=50
/// responses=123456
/// timeouts=0
/// elapsed_sec=5.002
/// rps=24681.3
/// ```
pub fn render_plain(summary: &BenchmarkSummary) -> String {
    format!(
        "connections={}\nresponses={}\ntimeouts={}\nelapsed_sec={:.3}\nrps={:.1}",
        summary.connections,
        summary.total_responses,
        summary.timeouts,
        summary.elapsed_secs(),
        summary.rate,
    )
}

/// Render a colorized human-readable summary.
///
/// Colors follow the global `colored` override, so callers disable them for
/// `--no-color` or piped output.
pub fn render_summary(summary: &BenchmarkSummary) -> String {
    let mut lines = vec![render_header(&summary.config)];

    lines.push(format_metric_row(
        "rpc_responses",
        &summary.total_responses.to_string().green().to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "rpc_throughput",
        &format!("{:.1} resp/s", summary.rate).green().to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "rpc_elapsed",
        &format!("{:.3}s", summary.elapsed_secs()),
        PAD_WIDTH,
    ));

    let lat = &summary.latency;
    lines.push(format_metric_row(
        "rpc_round_trip",
        &format!(
            "p50={}us  p95={}us  p99={}us  max={}us",
            lat.p50_us, lat.p95_us, lat.p99_us, lat.max_us
        ),
        PAD_WIDTH,
    ));

    let failed: u64 = summary.errors.values().sum();
    let failed_str = if failed > 0 {
        failed.to_string().red().to_string()
    } else {
        failed.to_string()
    };
    lines.push(format_metric_row("workers_failed", &failed_str, PAD_WIDTH));

    if !summary.errors.is_empty() {
        lines.push(String::new());
        lines.push("  errors:".to_string());
        let mut categories: Vec<_> = summary.errors.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (category, count) in categories {
            lines.push(format_metric_row(
                &format!("  {category}"),
                &count.to_string().red().to_string(),
                PAD_WIDTH,
            ));
        }
    }

    lines.join("\n")
}

fn render_header(config: &RunConfig) -> String {
    format!(
        "  {}\n\n  target:      {}\n  method:      {}\n  connections: {}\n  duration:    {:.3}s\n  timeout:     {:.3}s\n",
        "rpcbench".bold(),
        config.target(),
        config.method,
        config.connections,
        config.duration.as_secs_f64(),
        config.timeout.as_secs_f64(),
    )
}

/// Format a single metric row with dot-padding.
fn format_metric_row(name: &str, value: &str, pad_width: usize) -> String {
    format!("  {name:.<pad_width$}: {value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadtest::config::Settings;
    use crate::loadtest::error::WorkerError;

    fn setup_no_color() {
        colored::control::set_override(false);
    }

    fn config(connections: u32) -> Arc<RunConfig> {
        let settings = Settings {
            connections,
            ..Settings::default()
        };
        Arc::new(settings.validate().unwrap())
    }

    fn result(index: u32, responses: u64, stop: StopReason) -> WorkerResult {
        WorkerResult {
            index,
            responses,
            stop,
            latency: LatencyRecorder::new(),
        }
    }

    #[test]
    fn test_aggregate_sums_counts() {
        let results = vec![
            result(0, 10, StopReason::Deadline),
            result(1, 0, StopReason::Failed(WorkerError::StreamClosed)),
            result(2, 7, StopReason::Deadline),
        ];
        let summary = BenchmarkSummary::aggregate(config(3), &results, Duration::from_secs(1));
        assert_eq!(summary.connections, 3);
        assert_eq!(summary.total_responses, 17);
        assert_eq!(summary.rate, 17.0);
        assert_eq!(summary.errors.get("closed"), Some(&1));
        assert_eq!(summary.timeouts, 0);
    }

    #[test]
    fn test_zero_elapsed_rate_is_zero() {
        let results = vec![result(0, 5, StopReason::Deadline)];
        let summary = BenchmarkSummary::aggregate(config(1), &results, Duration::ZERO);
        assert_eq!(summary.total_responses, 5);
        assert_eq!(summary.rate, 0.0);
        assert!(summary.rate.is_finite());
    }

    #[test]
    fn test_all_failed_still_summarizes() {
        let err = WorkerError::Connection {
            message: "refused".to_string(),
        };
        let results: Vec<_> = (0..4)
            .map(|i| result(i, 0, StopReason::Failed(err.clone())))
            .collect();
        let summary = BenchmarkSummary::aggregate(config(4), &results, Duration::from_millis(3));
        assert_eq!(summary.total_responses, 0);
        assert_eq!(summary.rate, 0.0);
        assert_eq!(summary.errors.get("connection"), Some(&4));
    }

    #[test]
    fn test_timeouts_and_aborted_counted() {
        let results = vec![
            result(
                0,
                2,
                StopReason::Failed(WorkerError::Timeout {
                    after: Duration::from_millis(200),
                }),
            ),
            result(1, 0, StopReason::Aborted),
            result(2, 1, StopReason::Shutdown),
        ];
        let summary = BenchmarkSummary::aggregate(config(3), &results, Duration::from_secs(2));
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.errors.get("timeout"), Some(&1));
        assert_eq!(summary.errors.get("aborted"), Some(&1));
        assert_eq!(summary.total_responses, 3);
        assert_eq!(summary.rate, 1.5);
    }

    #[test]
    fn test_latency_merged_across_workers() {
        let mut a = result(0, 1, StopReason::Deadline);
        a.latency.record(Duration::from_micros(100));
        let mut b = result(1, 1, StopReason::Deadline);
        b.latency.record(Duration::from_micros(900));
        let summary = BenchmarkSummary::aggregate(config(2), &[a, b], Duration::from_secs(1));
        assert_eq!(summary.latency.max_us, 900);
    }

    #[test]
    fn test_render_plain_format() {
        let summary = BenchmarkSummary {
            config: config(50),
            connections: 50,
            total_responses: 1234,
            elapsed: Duration::from_millis(5002),
            rate: 246.7013,
            timeouts: 1,
            errors: BTreeMap::new(),
            latency: LatencySnapshot::default(),
        };
        assert_eq!(
            render_plain(&summary),
            "connections=50\nresponses=1234\ntimeouts=1\nelapsed_sec=5.002\nrps=246.7"
        );
    }

    #[test]
    fn test_render_summary_rows() {
        setup_no_color();
        let results = vec![
            result(0, 30, StopReason::Deadline),
            result(1, 0, StopReason::Failed(WorkerError::StreamClosed)),
        ];
        let summary = BenchmarkSummary::aggregate(config(2), &results, Duration::from_secs(3));
        let output = render_summary(&summary);

        assert!(output.contains("rpcbench"));
        assert!(output.contains("target:      127.0.0.1:8080"));
        assert!(output.contains("rpc_responses"));
        assert!(output.contains(": 30"));
        assert!(output.contains("10.0 resp/s"));
        assert!(output.contains("errors:"));
        assert!(output.contains("closed"));
    }

    #[test]
    fn test_render_summary_no_errors_section() {
        setup_no_color();
        let results = vec![result(0, 3, StopReason::Deadline)];
        let summary = BenchmarkSummary::aggregate(config(1), &results, Duration::from_secs(1));
        assert!(!render_summary(&summary).contains("errors:"));
    }

    #[test]
    fn test_format_metric_row_padding() {
        let row = format_metric_row("rpc_total", "100", 20);
        assert_eq!(row, "  rpc_total...........: 100");
    }
}
