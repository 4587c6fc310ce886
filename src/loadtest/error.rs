//! Error types for the benchmark.
//!
//! [`LoadTestError`] covers invalid run parameters and config file problems.
//! It is the only error that aborts a run, and it is always raised before
//! any connection is attempted.
//!
//! [`WorkerError`] covers everything that can end a single connection's
//! request loop. Those errors never leave the worker: they are reported on
//! the diagnostics channel and the worker returns its partial count.

use std::time::Duration;

/// Errors raised while loading or validating the benchmark configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    /// A run parameter has an invalid value.
    #[error("invalid {field}: {message}")]
    ConfigValidation {
        /// Name of the offending setting (e.g. `"connections"`).
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// The config file is not valid TOML or does not match the schema.
    #[error("failed to parse config TOML: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// The config file could not be read from disk.
    #[error("failed to read config file '{path}': {source}")]
    ConfigIo {
        source: std::io::Error,
        path: String,
    },
}

impl LoadTestError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field,
            message: message.into(),
        }
    }

    /// Returns the offending field for validation errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::ConfigValidation { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Reasons a connection worker stops before its deadline.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The connection could not be established.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Writing or flushing a request failed.
    #[error("send failed: {message}")]
    Send { message: String },

    /// Reading the response failed with an I/O error.
    #[error("receive failed: {message}")]
    Receive { message: String },

    /// No complete response line arrived within the per-request timeout.
    #[error("timeout waiting for response after {after:?}")]
    Timeout { after: Duration },

    /// The server closed the connection.
    #[error("server closed connection")]
    StreamClosed,

    /// A response line exceeded the configured limit.
    #[error("response too large (limit {limit} bytes)")]
    ResponseTooLarge { limit: usize },

    /// The request could not be serialized.
    #[error("failed to encode request: {message}")]
    Encode { message: String },
}

impl WorkerError {
    /// Returns the error category as a static string for summary breakdowns.
    ///
    /// Categories: `"connection"`, `"send"`, `"receive"`, `"timeout"`,
    /// `"closed"`, `"too_large"`, `"encode"`.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Send { .. } => "send",
            Self::Receive { .. } => "receive",
            Self::Timeout { .. } => "timeout",
            Self::StreamClosed => "closed",
            Self::ResponseTooLarge { .. } => "too_large",
            Self::Encode { .. } => "encode",
        }
    }

    /// Returns `true` if the worker gave up waiting on a response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
