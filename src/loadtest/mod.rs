//! Throughput benchmark for line-delimited JSON-RPC servers.
//!
//! Provides typed TOML configuration, a newline-framed stream client,
//! per-connection workers, a deadline-bounded coordinator and
//! HdrHistogram-based latency metrics.

pub mod client;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;
pub mod summary;
pub mod worker;
