//! rpcbench: throughput benchmark for JSON-RPC servers that speak
//! newline-delimited JSON over TCP.
//!
//! Opens N concurrent connections, each sending one request at a time until a
//! shared deadline, and reports how many complete responses arrived.
//!
//! ```no_run
//! use rpcbench::{LoadTestEngine, Settings};
//!
//! # async fn run() -> Result<(), rpcbench::LoadTestError> {
//! let settings = Settings {
//!     connections: 8,
//!     duration_secs: 2.0,
//!     ..Settings::default()
//! };
//! let summary = LoadTestEngine::new(settings).run().await?;
//! println!("{} responses, {:.1} rps", summary.total_responses, summary.rate);
//! # Ok(())
//! # }
//! ```

pub mod loadtest;

pub use loadtest::config::{RunConfig, Settings};
pub use loadtest::engine::{Deadline, LoadTestEngine};
pub use loadtest::error::{LoadTestError, WorkerError};
pub use loadtest::summary::BenchmarkSummary;
