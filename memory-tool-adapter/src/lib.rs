//! Stateless stdio proxy: reads length- or line-framed JSON-RPC requests,
//! relays tool calls to the memory worker's HTTP API, and writes back a
//! JSON-RPC response per request (§6).

pub mod client;
pub mod jsonrpc;
pub mod protocol;
pub mod tools;

use client::WorkerClient;
use jsonrpc::{JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
use protocol::{CallToolParams, InitializeResult, ListToolsResult};
use serde_json::{json, Value};
use tracing::warn;

/// Handle one parsed request, returning `None` for notifications (requests
/// with no `id`), matching the JSON-RPC convention the worker's callers
/// already rely on.
pub async fn handle_request(client: &WorkerClient, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = request.id.clone()?;
    if id.is_null() {
        return None;
    }

    match request.method.as_str() {
        "initialize" => Some(JsonRpcResponse::ok(Some(id), initialize_result())),
        "tools/list" => Some(JsonRpcResponse::ok(Some(id), list_tools_result())),
        "tools/call" => Some(handle_call_tool(client, Some(id), request.params).await),
        "shutdown" => Some(JsonRpcResponse::ok(Some(id), json!({"ok": true}))),
        other => {
            warn!(method = other, "unknown method");
            Some(JsonRpcResponse::err(Some(id), METHOD_NOT_FOUND, format!("unknown method: {other}")))
        }
    }
}

fn initialize_result() -> Value {
    serde_json::to_value(InitializeResult {
        protocol_version: "2025-11-25".to_string(),
        capabilities: json!({"tools": {"listChanged": false}}),
        server_info: json!({"name": "memory-tool-adapter", "version": env!("CARGO_PKG_VERSION")}),
    })
    .unwrap_or(Value::Null)
}

fn list_tools_result() -> Value {
    serde_json::to_value(ListToolsResult { tools: tools::definitions() }).unwrap_or(Value::Null)
}

async fn handle_call_tool(client: &WorkerClient, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
    let Some(params) = params else {
        return JsonRpcResponse::err(id, INVALID_PARAMS, "missing params");
    };
    let params: CallToolParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return JsonRpcResponse::err(id, INVALID_PARAMS, format!("invalid params: {e}")),
    };

    match tools::call(client, &params.name, params.arguments).await {
        Ok(result) => match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::ok(id, value),
            Err(e) => JsonRpcResponse::err(id, INTERNAL_ERROR, format!("failed to serialize tool result: {e}")),
        },
        Err(tools::ToolError::Unknown(name)) => JsonRpcResponse::err(id, METHOD_NOT_FOUND, format!("unknown tool: {name}")),
        Err(tools::ToolError::InvalidArguments(e)) => JsonRpcResponse::err(id, INVALID_PARAMS, format!("invalid arguments: {e}")),
        Err(tools::ToolError::Client(e)) => JsonRpcResponse::err(id, INTERNAL_ERROR, format!("{e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let client = WorkerClient::new("http://127.0.0.1:3001".to_string());
        let request = JsonRpcRequest { id: None, method: "tools/list".to_string(), params: None };
        assert!(handle_request(&client, request).await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_returns_method_not_found() {
        let client = WorkerClient::new("http://127.0.0.1:3001".to_string());
        let request = JsonRpcRequest { id: Some(json!(1)), method: "nope".to_string(), params: None };
        let response = handle_request(&client, request).await.unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn initialize_reports_every_tool() {
        let client = WorkerClient::new("http://127.0.0.1:3001".to_string());
        let request = JsonRpcRequest { id: Some(json!(1)), method: "tools/list".to_string(), params: None };
        let response = handle_request(&client, request).await.unwrap();
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), tools::definitions().len());
    }
}
