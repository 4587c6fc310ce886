//! Newline-delimited JSON-RPC request encoding.
//!
//! Each request is serialized compactly, so string contents are escaped
//! and the payload never contains a raw newline. The single `\n` appended
//! afterwards is the frame delimiter.

use serde::Serialize;

/// JSON-RPC protocol version tag carried by every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC request, built and discarded per send.
///
/// Fields serialize in declaration order: `jsonrpc`, `id`, `method`, then
/// `params` only when present.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RpcRequest<'a> {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: &'static str,
    /// Per-connection request id, starting at 1.
    pub id: u64,
    /// Method name.
    pub method: &'a str,
    /// Structured params, omitted from the wire when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a serde_json::Value>,
}

impl<'a> RpcRequest<'a> {
    /// Create a request for `method` with the given id.
    pub fn new(method: &'a str, params: Option<&'a serde_json::Value>, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }

    /// Serialize into a newline-terminated frame.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

/// Encode `(method, params, id)` as one newline-terminated request line.
///
/// Deterministic: identical arguments always produce identical bytes.
/// Serializing a [`serde_json::Value`] cannot fail in practice; the error
/// is surfaced rather than hidden.
pub fn encode(
    method: &str,
    params: Option<&serde_json::Value>,
    id: u64,
) -> Result<Vec<u8>, serde_json::Error> {
    RpcRequest::new(method, params, id).to_line()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_without_params() {
        let line = encode("ping", None, 1).unwrap();
        assert_eq!(line, b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
    }

    #[test]
    fn test_encode_with_params() {
        let params = json!([1, 2]);
        let line = encode("add", Some(&params), 7).unwrap();
        assert_eq!(
            line,
            b"{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"add\",\"params\":[1,2]}\n"
        );
    }

    #[test]
    fn test_params_key_absent_not_null() {
        let line = String::from_utf8(encode("ping", None, 3).unwrap()).unwrap();
        assert!(!line.contains("params"));
        assert!(!line.contains("null"));
    }

    #[test]
    fn test_single_trailing_newline() {
        let params = json!({"text": "line one\nline two\r\n"});
        let line = encode("echo", Some(&params), 1).unwrap();
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(line.last(), Some(&b'\n'));
        assert!(!line[..line.len() - 1].contains(&b'\r'));
    }

    #[test]
    fn test_deterministic() {
        let params = json!({"b": [true, null], "a": 1.5});
        let first = encode("m", Some(&params), 42).unwrap();
        let second = encode("m", Some(&params), 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decodes_back() {
        let params = json!({"x": 1});
        let line = encode("compute", Some(&params), 9).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": 9, "method": "compute", "params": {"x": 1}})
        );
    }
}
