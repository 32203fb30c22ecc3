//! Wire types and stdio framing for the tool protocol: line-delimited JSON
//! or LSP-style `Content-Length` framing, whichever the caller sends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Read, Write};

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn ok(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    pub fn err(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(JsonRpcError { code, message: message.into(), data: None }) }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Read one message, accepting both a bare JSON line and an LSP-style
/// `Content-Length: N\r\n\r\n<body>` header. Returns `(body, was_framed)`.
pub fn read_next_message<R: BufRead + Read>(reader: &mut R) -> io::Result<Option<(String, bool)>> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('{') {
            return Ok(Some((trimmed.to_string(), false)));
        }

        let low = trimmed.to_ascii_lowercase();
        if low.starts_with("content-length:") {
            let len: usize = trimmed.splitn(2, ':').nth(1).map(str::trim).and_then(|s| s.parse().ok()).unwrap_or(0);

            loop {
                let mut hline = String::new();
                let hn = reader.read_line(&mut hline)?;
                if hn == 0 || hline.trim().is_empty() {
                    break;
                }
            }

            if len == 0 {
                continue;
            }
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            return Ok(Some((String::from_utf8_lossy(&buf).to_string(), true)));
        }

        continue;
    }
}

/// Write a response using `Content-Length` framing, mirroring whatever the
/// matching request arrived with.
pub fn write_response_with_length<W: Write>(writer: &mut W, body: &str) -> io::Result<()> {
    let bytes = body.as_bytes();
    let header = format!("Content-Length: {}\r\n\r\n", bytes.len());
    writer.write_all(header.as_bytes())?;
    writer.write_all(bytes)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Write a response as a single newline-terminated JSON line.
pub fn write_response_line<W: Write>(writer: &mut W, body: &str) -> io::Result<()> {
    writeln!(writer, "{body}")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_a_bare_json_line() {
        let mut reader = Cursor::new(b"{\"jsonrpc\":\"2.0\"}\n".to_vec());
        let (body, framed) = read_next_message(&mut reader).unwrap().unwrap();
        assert_eq!(body, "{\"jsonrpc\":\"2.0\"}");
        assert!(!framed);
    }

    #[test]
    fn reads_a_content_length_framed_message() {
        let payload = b"{\"a\":1}";
        let mut input = format!("Content-Length: {}\r\n\r\n", payload.len()).into_bytes();
        input.extend_from_slice(payload);
        let mut reader = Cursor::new(input);
        let (body, framed) = read_next_message(&mut reader).unwrap().unwrap();
        assert_eq!(body, "{\"a\":1}");
        assert!(framed);
    }

    #[test]
    fn returns_none_at_eof() {
        let mut reader = Cursor::new(Vec::new());
        assert!(read_next_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn skips_stray_log_lines_before_a_message() {
        let mut reader = Cursor::new(b"some stray log output\n{\"ok\":true}\n".to_vec());
        let (body, framed) = read_next_message(&mut reader).unwrap().unwrap();
        assert_eq!(body, "{\"ok\":true}");
        assert!(!framed);
    }
}
