//! Side channel for per-worker failure notices.
//!
//! Workers never fail past their own boundary; whenever one stops early it
//! reports why through a [`DiagnosticSink`]. Notices are informational only
//! and never feed back into the summary.

use crate::loadtest::error::WorkerError;

/// Receiver of per-worker failure notices.
pub trait DiagnosticSink: Send + Sync {
    /// Worker `worker` stopped early because of `error`.
    fn worker_stopped(&self, worker: u32, error: &WorkerError);
}

/// Default sink: one `warn` event per notice on the tracing subscriber.
///
/// The binary points the subscriber at stderr, keeping stdout for the report.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn worker_stopped(&self, worker: u32, error: &WorkerError) {
        tracing::warn!(
            worker,
            category = error.category(),
            "worker {worker}: {error}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting(Mutex<Vec<(u32, WorkerError)>>);

    impl DiagnosticSink for Collecting {
        fn worker_stopped(&self, worker: u32, error: &WorkerError) {
            self.0.lock().unwrap().push((worker, error.clone()));
        }
    }

    #[test]
    fn test_sink_is_object_safe() {
        let sink = Collecting::default();
        let dyn_sink: &dyn DiagnosticSink = &sink;
        dyn_sink.worker_stopped(3, &WorkerError::StreamClosed);
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            &[(3, WorkerError::StreamClosed)]
        );
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        TracingDiagnostics.worker_stopped(0, &WorkerError::StreamClosed);
    }
}
