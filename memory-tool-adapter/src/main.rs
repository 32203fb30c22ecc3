//! Stdio entry point: reads the worker's base URL from the environment,
//! then loops over stdin dispatching JSON-RPC requests until EOF (§6).
//!
//! Tracing writes to stderr, never stdout — stdout is reserved for the
//! JSON-RPC wire protocol.

use memory_core::config::WorkerConfig;
use memory_tool_adapter::client::WorkerClient;
use memory_tool_adapter::jsonrpc::{self, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use std::io::{self, BufRead, Write};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_writer(io::stderr).init();

    let base_url = worker_base_url();
    info!(%base_url, "starting memory-tool-adapter");
    let client = WorkerClient::new(base_url);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();

    loop {
        match jsonrpc::read_next_message(&mut handle) {
            Ok(None) => {
                info!("stdin closed, shutting down");
                break;
            }
            Ok(Some((line, framed))) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                    Ok(request) => memory_tool_adapter::handle_request(&client, request).await,
                    Err(e) => {
                        error!(error = %e, "failed to parse JSON-RPC request");
                        Some(JsonRpcResponse::err(None, PARSE_ERROR, format!("parse error: {e}")))
                    }
                };
                if let Some(response) = response {
                    write_response(&mut stdout, &response, framed)?;
                }
            }
            Err(e) => {
                error!(error = %e, "failed to read from stdin");
                break;
            }
        }
    }

    Ok(())
}

fn write_response(stdout: &mut impl Write, response: &JsonRpcResponse, framed: bool) -> anyhow::Result<()> {
    let body = serde_json::to_string(response)?;
    if framed {
        jsonrpc::write_response_with_length(stdout, &body)?;
    } else {
        jsonrpc::write_response_line(stdout, &body)?;
    }
    Ok(())
}

/// The worker's own `WorkerConfig` already knows its host/port (§6); reusing
/// it here keeps the adapter's idea of "where the worker is" in sync with
/// the worker's own default instead of hardcoding a second copy.
fn worker_base_url() -> String {
    std::env::var("KIRO_MEMORY_WORKER_URL").unwrap_or_else(|_| {
        let config = WorkerConfig::from_env();
        format!("http://{}:{}", config.host, config.port)
    })
}
