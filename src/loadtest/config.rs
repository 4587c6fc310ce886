//! Benchmark configuration.
//!
//! [`Settings`] is the raw input: it deserializes from a TOML file and is
//! then patched with CLI overrides. Nothing in it is trusted yet.
//! [`Settings::validate`] turns it into a [`RunConfig`], the immutable value
//! every worker shares.
//!
//! # Example TOML
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 8080
//! connections = 50
//! duration_secs = 5.0
//! timeout_secs = 5.0
//! method = "ping"
//! params = '{"x": 1}'
//! ```
//!
//! Every key is optional. `params` is raw JSON text, the same form the
//! `--params` flag takes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::loadtest::error::LoadTestError;

/// Largest response line accepted before a worker gives up.
pub const DEFAULT_MAX_LINE_BYTES: usize = 131_072;

/// Raw benchmark settings, before validation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Target host name or address.
    pub host: String,
    /// Target TCP port.
    pub port: u16,
    /// Number of parallel connections (one worker each).
    pub connections: u32,
    /// Benchmark duration in seconds. Fractions are allowed.
    pub duration_secs: f64,
    /// Per-request read timeout in seconds. Fractions are allowed.
    pub timeout_secs: f64,
    /// JSON-RPC method to call.
    pub method: String,
    /// Optional params as JSON text. `null` means none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// Longest response line accepted, in bytes.
    pub max_line_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            connections: 50,
            duration_secs: 5.0,
            timeout_secs: 5.0,
            method: "ping".to_string(),
            params: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string. Missing keys take their defaults.
    ///
    /// The result is not validated; see [`Settings::validate`].
    pub fn from_toml(content: &str) -> Result<Self, LoadTestError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Check every setting and build the immutable [`RunConfig`].
    ///
    /// Fails on the first invalid field, naming it in the error.
    pub fn validate(&self) -> Result<RunConfig, LoadTestError> {
        if self.host.trim().is_empty() {
            return Err(LoadTestError::invalid("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(LoadTestError::invalid("port", "must be > 0"));
        }
        if self.connections == 0 {
            return Err(LoadTestError::invalid("connections", "must be > 0"));
        }
        let duration = positive_secs("duration", self.duration_secs)?;
        let timeout = positive_secs("timeout", self.timeout_secs)?;
        if self.method.is_empty() {
            return Err(LoadTestError::invalid("method", "must not be empty"));
        }
        if self.max_line_bytes == 0 {
            return Err(LoadTestError::invalid("max_line_bytes", "must be > 0"));
        }
        let params = match self.params.as_deref() {
            Some(raw) => parse_params(raw)?,
            None => None,
        };

        Ok(RunConfig {
            host: self.host.clone(),
            port: self.port,
            connections: self.connections,
            duration,
            timeout,
            method: self.method.clone(),
            params,
            max_line_bytes: self.max_line_bytes,
        })
    }
}

fn positive_secs(field: &'static str, secs: f64) -> Result<Duration, LoadTestError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(LoadTestError::invalid(field, "must be > 0"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| LoadTestError::invalid(field, e.to_string()))
}

/// Parse raw params text. JSON `null` means no params.
fn parse_params(raw: &str) -> Result<Option<serde_json::Value>, LoadTestError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| LoadTestError::invalid("params", format!("must be valid JSON: {e}")))?;
    Ok((!value.is_null()).then_some(value))
}

/// Validated, immutable description of one benchmark run.
///
/// Built once by [`Settings::validate`] and shared read-only by all workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Target host name or address.
    pub host: String,
    /// Target TCP port.
    pub port: u16,
    /// Number of workers, always > 0.
    pub connections: u32,
    /// Wall-clock length of the run.
    pub duration: Duration,
    /// Bound on waiting for a single response (and on connecting).
    pub timeout: Duration,
    /// JSON-RPC method name, never empty.
    pub method: String,
    /// Request params, omitted from the wire when `None`.
    pub params: Option<serde_json::Value>,
    /// Longest response line accepted, in bytes.
    pub max_line_bytes: usize,
}

impl RunConfig {
    /// Returns the `host:port` pair used for display.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.connections, 50);
        assert_eq!(settings.duration_secs, 5.0);
        assert_eq!(settings.timeout_secs, 5.0);
        assert_eq!(settings.method, "ping");
        assert!(settings.params.is_none());
    }

    #[test]
    fn test_validate_defaults() {
        let config = Settings::default().validate().unwrap();
        assert_eq!(config.connections, 50);
        assert_eq!(config.duration, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.target(), "127.0.0.1:8080");
        assert!(config.params.is_none());
    }

    #[test]
    fn test_fractional_seconds() {
        let settings = Settings {
            duration_secs: 0.25,
            timeout_secs: 0.2,
            ..Settings::default()
        };
        let config = settings.validate().unwrap();
        assert_eq!(config.duration, Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_millis(200));
    }

    #[test]
    fn test_zero_connections_rejected() {
        let settings = Settings {
            connections: 0,
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), Some("connections"));
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let settings = Settings {
                duration_secs: secs,
                ..Settings::default()
            };
            let err = settings.validate().unwrap_err();
            assert_eq!(err.field(), Some("duration"), "duration_secs={secs}");
        }
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        let settings = Settings {
            timeout_secs: -0.5,
            ..Settings::default()
        };
        assert_eq!(settings.validate().unwrap_err().field(), Some("timeout"));
    }

    #[test]
    fn test_empty_method_rejected() {
        let settings = Settings {
            method: String::new(),
            ..Settings::default()
        };
        assert_eq!(settings.validate().unwrap_err().field(), Some("method"));
    }

    #[test]
    fn test_params_parsed() {
        let settings = Settings {
            params: Some(r#"{"x": 1}"#.to_string()),
            ..Settings::default()
        };
        let config = settings.validate().unwrap();
        assert_eq!(config.params, Some(serde_json::json!({"x": 1})));

        let settings = Settings {
            params: Some("[1,2]".to_string()),
            ..Settings::default()
        };
        let config = settings.validate().unwrap();
        assert_eq!(config.params, Some(serde_json::json!([1, 2])));
    }

    #[test]
    fn test_invalid_params_rejected() {
        for raw in ["{not json", "", "[1,", "ping"] {
            let settings = Settings {
                params: Some(raw.to_string()),
                ..Settings::default()
            };
            let err = settings.validate().unwrap_err();
            assert_eq!(err.field(), Some("params"), "params={raw:?}");
        }
    }

    #[test]
    fn test_null_params_omitted() {
        let settings = Settings {
            params: Some("null".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.validate().unwrap().params, None);
    }

    #[test]
    fn test_scalar_params_accepted() {
        for (raw, expected) in [
            ("42", serde_json::json!(42)),
            ("\"text\"", serde_json::json!("text")),
            ("true", serde_json::json!(true)),
        ] {
            let settings = Settings {
                params: Some(raw.to_string()),
                ..Settings::default()
            };
            assert_eq!(settings.validate().unwrap().params, Some(expected));
        }
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = Settings::from_toml(
            r#"
port = 9000
connections = 4
duration_secs = 1.5
params = '[1, "two"]'
"#,
        )
        .unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.connections, 4);
        assert_eq!(settings.duration_secs, 1.5);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.params.as_deref(), Some(r#"[1, "two"]"#));
    }

    #[test]
    fn test_from_toml_unknown_key() {
        let result = Settings::from_toml("virtual_users = 10");
        assert!(matches!(result, Err(LoadTestError::ConfigParse { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Settings::load(Path::new("/nonexistent/rpcbench.toml"));
        assert!(matches!(result, Err(LoadTestError::ConfigIo { .. })));
    }
}
