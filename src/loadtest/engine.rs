//! Benchmark coordinator.
//!
//! [`LoadTestEngine`] is the top-level orchestrator that:
//! - Validates the settings before touching the network
//! - Computes one shared [`Deadline`] from the start time
//! - Spawns one worker task per connection via [`TaskTracker`]
//! - Joins every worker, then reduces their results into a
//!   [`BenchmarkSummary`]
//!
//! Workers share nothing mutable. A worker with a request in flight when the
//! deadline passes is waited for, never truncated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::loadtest::config::Settings;
use crate::loadtest::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::loadtest::error::LoadTestError;
use crate::loadtest::summary::BenchmarkSummary;
use crate::loadtest::worker::{run_worker, WorkerResult};

/// Shared cutoff after which no worker starts a new request.
///
/// Computed once by the coordinator and copied into every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// Deadline `duration` after `start`. A duration too large to represent
    /// never expires.
    pub fn after(start: Instant, duration: Duration) -> Self {
        Self(start.checked_add(duration))
    }

    /// Deadline at a fixed instant.
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Returns `true` once the current time is at or past the deadline.
    pub fn has_passed(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

/// Top-level benchmark configuration and entry point.
pub struct LoadTestEngine {
    settings: Settings,
    diagnostics: Arc<dyn DiagnosticSink>,
    shutdown: CancellationToken,
}

impl LoadTestEngine {
    /// Creates an engine that reports worker failures through `tracing`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            diagnostics: Arc::new(TracingDiagnostics),
            shutdown: CancellationToken::new(),
        }
    }

    /// Sets the sink that receives per-worker failure notices.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Sets the token that requests an early, graceful stop.
    ///
    /// Cancelling it has the same effect on workers as the deadline passing.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run the benchmark.
    ///
    /// Fails only on invalid settings, in which case no connection is
    /// attempted. Otherwise a summary is always produced, even when every
    /// connection failed. The summary carries the validated config.
    pub async fn run(&self) -> Result<BenchmarkSummary, LoadTestError> {
        let config = Arc::new(self.settings.validate()?);

        tracing::info!(
            target = %config.target(),
            connections = config.connections,
            duration = ?config.duration,
            timeout = ?config.timeout,
            method = %config.method,
            "starting benchmark"
        );

        let tracker = TaskTracker::new();
        let start = Instant::now();
        let deadline = Deadline::after(start, config.duration);

        let handles: Vec<(u32, JoinHandle<WorkerResult>)> = (0..config.connections)
            .map(|index| {
                let handle = tracker.spawn(run_worker(
                    index,
                    config.clone(),
                    deadline,
                    self.shutdown.clone(),
                    self.diagnostics.clone(),
                ));
                (index, handle)
            })
            .collect();
        tracker.close();

        let results = collect_results(handles).await;
        tracker.wait().await;
        let elapsed = start.elapsed();

        let summary = BenchmarkSummary::aggregate(config, &results, elapsed);
        tracing::info!(
            responses = summary.total_responses,
            elapsed = ?summary.elapsed,
            rate = summary.rate,
            "benchmark finished"
        );
        Ok(summary)
    }
}

/// Await every worker in spawn order.
///
/// A worker task that panicked contributes an aborted, zero-count result so
/// the result list always has one entry per connection.
async fn collect_results(handles: Vec<(u32, JoinHandle<WorkerResult>)>) -> Vec<WorkerResult> {
    let mut results = Vec::with_capacity(handles.len());
    for (index, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::error!(worker = index, error = %e, "worker task failed");
                results.push(WorkerResult::aborted(index));
            },
        }
    }
    results
}

/// Ctrl+C handler with two-phase shutdown.
///
/// First Ctrl+C cancels `shutdown`, letting workers finish their in-flight
/// request. Second Ctrl+C aborts the process.
pub async fn handle_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    tracing::warn!("received Ctrl+C, stopping gracefully");
    shutdown.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::error!("received second Ctrl+C, aborting");
        std::process::exit(1);
    }
}
