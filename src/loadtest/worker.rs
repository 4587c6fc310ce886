//! Connection worker: one connection, one serial request loop.
//!
//! Each worker owns its connection, its request-id counter, its response
//! counter and its latency recorder. The only things it shares are the
//! read-only [`RunConfig`], the [`Deadline`] and the shutdown token. There
//! is no reconnection: a worker that loses its connection is done.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::loadtest::client::LineClient;
use crate::loadtest::codec;
use crate::loadtest::config::RunConfig;
use crate::loadtest::diagnostics::DiagnosticSink;
use crate::loadtest::engine::Deadline;
use crate::loadtest::error::WorkerError;
use crate::loadtest::metrics::LatencyRecorder;

/// Why a worker's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The shared deadline passed between requests.
    Deadline,
    /// Shutdown was requested between requests.
    Shutdown,
    /// The worker stopped early on an error.
    Failed(WorkerError),
    /// The worker task panicked; its count is lost.
    Aborted,
}

impl StopReason {
    /// Returns the worker error, if the worker stopped on one.
    pub fn error(&self) -> Option<&WorkerError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Terminal outcome of one worker.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    /// Ordinal of the worker, `0..connections`.
    pub index: u32,
    /// Fully received responses.
    pub responses: u64,
    /// Why the loop ended.
    pub stop: StopReason,
    /// Round-trip latency of every counted response.
    pub latency: LatencyRecorder,
}

impl WorkerResult {
    /// Result for a worker whose task never produced one.
    pub fn aborted(index: u32) -> Self {
        Self {
            index,
            responses: 0,
            stop: StopReason::Aborted,
            latency: LatencyRecorder::new(),
        }
    }
}

/// Connect, run the request loop, release the connection.
///
/// Never fails: errors are reported to `diagnostics` and the count so far
/// is returned.
pub async fn run_worker(
    index: u32,
    config: Arc<RunConfig>,
    deadline: Deadline,
    shutdown: CancellationToken,
    diagnostics: Arc<dyn DiagnosticSink>,
) -> WorkerResult {
    let client = match LineClient::connect(
        &config.host,
        config.port,
        config.timeout,
        config.max_line_bytes,
    )
    .await
    {
        Ok(client) => client,
        Err(err) => {
            diagnostics.worker_stopped(index, &err);
            return WorkerResult {
                index,
                responses: 0,
                stop: StopReason::Failed(err),
                latency: LatencyRecorder::new(),
            };
        },
    };

    drive(index, client, &config, deadline, &shutdown, diagnostics.as_ref()).await
}

/// Run the request loop over an established connection.
///
/// The connection is closed on every exit path; a failed close is logged at
/// debug level and otherwise ignored.
pub async fn drive<S>(
    index: u32,
    mut client: LineClient<S>,
    config: &RunConfig,
    deadline: Deadline,
    shutdown: &CancellationToken,
    diagnostics: &dyn DiagnosticSink,
) -> WorkerResult
where
    S: AsyncRead + AsyncWrite,
{
    let mut latency = LatencyRecorder::new();
    let mut responses = 0u64;
    let stop = request_loop(
        &mut client,
        config,
        deadline,
        shutdown,
        &mut responses,
        &mut latency,
    )
    .await;

    if let Some(err) = stop.error() {
        diagnostics.worker_stopped(index, err);
    }

    if let Err(e) = client.close().await {
        tracing::debug!(worker = index, error = %e, "error closing connection");
    }

    tracing::debug!(worker = index, responses, stop = ?stop, "worker finished");

    WorkerResult {
        index,
        responses,
        stop,
        latency,
    }
}

async fn request_loop<S>(
    client: &mut LineClient<S>,
    config: &RunConfig,
    deadline: Deadline,
    shutdown: &CancellationToken,
    responses: &mut u64,
    latency: &mut LatencyRecorder,
) -> StopReason
where
    S: AsyncRead + AsyncWrite,
{
    let mut request_id = 0u64;

    loop {
        if deadline.has_passed() {
            return StopReason::Deadline;
        }
        if shutdown.is_cancelled() {
            return StopReason::Shutdown;
        }

        request_id += 1;
        let frame = match codec::encode(&config.method, config.params.as_ref(), request_id) {
            Ok(frame) => frame,
            Err(e) => {
                return StopReason::Failed(WorkerError::Encode {
                    message: e.to_string(),
                })
            },
        };

        let sent_at = Instant::now();
        if let Err(err) = client.send(&frame).await {
            return StopReason::Failed(err);
        }

        match tokio::time::timeout(config.timeout, client.read_line()).await {
            Err(_) => {
                return StopReason::Failed(WorkerError::Timeout {
                    after: config.timeout,
                })
            },
            Ok(Err(err)) => return StopReason::Failed(err),
            Ok(Ok(_)) => {
                *responses += 1;
                latency.record(sent_at.elapsed());
            },
        }
    }
}
