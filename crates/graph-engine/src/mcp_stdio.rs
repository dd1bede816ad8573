use crate::error::EngineResult;
use crate::mcp_types::{
    ExpandParams, McpRequest, McpResponse, ToolCall, UpsertEdgesParams, UpsertNodesParams,
    INVALID_PARAMS, METHOD_NOT_FOUND,
};
use crate::store::GraphStore;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{
    stdin, stdout, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

/// Serves tool calls on stdin/stdout until stdin closes.
pub async fn run_mcp_stdio(store: Arc<GraphStore>) -> EngineResult<()> {
    info!("Starting stdio tool server");
    serve_lines(&store, BufReader::new(stdin()), stdout()).await
}

/// Reads one JSON-RPC request per line and writes one response per line.
/// Lines that are not valid requests are skipped, and notifications get no reply.
pub async fn serve_lines<R, W>(store: &GraphStore, reader: R, mut writer: W) -> EngineResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: McpRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                warn!("Skipping unparseable request: {}", e);
                continue;
            }
        };

        let Some(response) = handle_request(store, request) else {
            continue;
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Runs the request and returns its reply. Notifications (requests without
/// an id) are still executed but return `None`.
pub fn handle_request(store: &GraphStore, request: McpRequest) -> Option<McpResponse> {
    debug!(method = %request.method, "stdio request");

    let is_notification = request.id.is_none();
    let response = dispatch(store, request);
    (!is_notification).then_some(response)
}

fn dispatch(store: &GraphStore, request: McpRequest) -> McpResponse {
    match request.method.as_str() {
        "initialize" => McpResponse::result(
            request.id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "graph-engine",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),
        "tools/list" => McpResponse::result(request.id, json!({ "tools": tool_list() })),
        "tools/call" => {
            let call: ToolCall = match parse(request.params.unwrap_or_default()) {
                Ok(call) => call,
                Err(msg) => return McpResponse::error(request.id, INVALID_PARAMS, msg),
            };
            match call_tool(store, call) {
                Ok(result) => McpResponse::result(
                    request.id,
                    json!({ "content": [{ "type": "text", "text": result.to_string() }] }),
                ),
                Err((code, msg)) => McpResponse::error(request.id, code, msg),
            }
        }
        other => McpResponse::error(
            request.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ),
    }
}

fn parse<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("Invalid arguments: {}", e))
}

fn call_tool(store: &GraphStore, call: ToolCall) -> Result<serde_json::Value, (i32, String)> {
    let invalid = |msg| (INVALID_PARAMS, msg);

    match call.name.as_str() {
        "upsert_nodes" => {
            let params: UpsertNodesParams = parse(call.arguments).map_err(invalid)?;
            let count = params.nodes.len();
            store.upsert_nodes(params.nodes);
            Ok(json!({ "ok": true, "upserted": count }))
        }
        "upsert_edges" => {
            let params: UpsertEdgesParams = parse(call.arguments).map_err(invalid)?;
            let count = params.edges.len();
            store.upsert_edges(params.edges);
            Ok(json!({ "ok": true, "appended": count }))
        }
        "expand_time_window" => {
            let params: ExpandParams = parse(call.arguments).map_err(invalid)?;
            let sub = store.expand_time_window(
                &params.seed_ids,
                params.start_ms,
                params.end_ms,
                params.max_hops,
            );
            Ok(json!(sub))
        }
        "graph_stats" => Ok(json!(store.stats())),
        other => Err((METHOD_NOT_FOUND, format!("Tool not found: {}", other))),
    }
}

fn tool_list() -> serde_json::Value {
    let attrs = json!({ "type": "object", "additionalProperties": { "type": "string" } });
    json!([
        {
            "name": "upsert_nodes",
            "description": "Insert or replace nodes by id (last write wins)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "nodes": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "type": { "type": "string" },
                                "ts": { "type": "integer" },
                                "attrs": attrs
                            },
                            "required": ["id"]
                        }
                    }
                },
                "required": ["nodes"]
            }
        },
        {
            "name": "upsert_edges",
            "description": "Append edges to the edge log",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "edges": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "src": { "type": "string" },
                                "dst": { "type": "string" },
                                "type": { "type": "string" },
                                "weight": { "type": "number", "default": 1.0 },
                                "ts": { "type": "integer" },
                                "attrs": attrs
                            },
                            "required": ["src", "dst"]
                        }
                    }
                },
                "required": ["edges"]
            }
        },
        {
            "name": "expand_time_window",
            "description": "Breadth-first neighborhood of the seed ids over edges inside [start_ms, end_ms]",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "seed_ids": { "type": "array", "items": { "type": "string" } },
                    "start_ms": { "type": "integer" },
                    "end_ms": { "type": "integer" },
                    "max_hops": { "type": "integer", "minimum": 0, "default": 0 }
                },
                "required": ["seed_ids", "start_ms", "end_ms"]
            }
        },
        {
            "name": "graph_stats",
            "description": "Node, edge and indexed id counts",
            "inputSchema": { "type": "object", "properties": {} }
        }
    ])
}
