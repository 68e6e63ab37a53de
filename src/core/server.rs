/// MCP Server Implementation
///
/// This module contains the MCP server plumbing:
/// - JSON-RPC 2.0 request/response structures
/// - Tool registry mapping tool names to async handlers
/// - A single dispatcher shared by both transports
/// - STDIO server (newline-delimited JSON-RPC, concurrent tool calls)
/// - HTTP server setup with Actix Web

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use actix_web::{
    App, HttpResponse, HttpServer,
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::config::Config;
use crate::core::error::ToolError;

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const JSONRPC_VERSION: &str = "2.0";
const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// Shared state handed to both transports.
///
/// Cloning is cheap: the registry sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server name as reported in MCP initialize responses
    pub server_name: String,
    /// Server version string as reported in MCP initialize responses
    pub server_version: String,
    /// Tool table built at process start
    pub registry: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(config: &Config, registry: ToolRegistry) -> Self {
        Self {
            server_name: config.server_name.clone(),
            server_version: config.server_version.clone(),
            registry: Arc::new(registry),
        }
    }
}

/// JSON-RPC 2.0 request structure for MCP protocol.
///
/// `id` is `None` for notifications, which never receive a response.
#[derive(Deserialize, Debug)]
pub struct MCPRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC 2.0 response structure. Exactly one of `result` and `error` is set.
#[derive(Serialize, Debug)]
pub struct MCPResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<MCPError>,
}

impl MCPResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(MCPError {
                code,
                message,
                data: None,
            }),
        }
    }
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Debug)]
pub struct MCPError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// MCP tool definition, serialized as-is in `tools/list`.
#[derive(Serialize, Debug, Clone)]
pub struct MCPTool {
    /// Unique tool identifier (e.g., "get_forecast")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Future returned by a tool handler.
pub type ToolFuture = BoxFuture<'static, Result<String, ToolError>>;

/// Tool handler function type definition.
///
/// A handler takes the raw `arguments` object and returns a boxed future
/// resolving to the tool's text output. Handlers own whatever clients they
/// need, so the future is `'static` and can run on its own task.
pub type ToolHandler = Box<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Registry of available MCP tools.
///
/// Keeps the tool definitions in registration order for discovery and a map
/// from tool name to handler for execution.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<MCPTool>,
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration under the same name replaces the
    /// earlier one.
    pub fn register(&mut self, tool: MCPTool, handler: ToolHandler) {
        let name = tool.name.clone();
        self.tools.retain(|existing| existing.name != name);
        self.tools.push(tool);
        self.handlers.insert(name, handler);
    }

    pub fn tools(&self) -> &[MCPTool] {
        &self.tools
    }

    /// Start a tool call, or `None` if no tool has that name.
    pub fn call(&self, name: &str, arguments: Value) -> Option<ToolFuture> {
        self.handlers.get(name).map(|handler| handler(arguments))
    }
}

/// Route one request to its method handler.
///
/// Returns `None` for notifications, which must not be answered.
pub async fn handle_request(state: &AppState, req: MCPRequest) -> Option<MCPResponse> {
    if req.id.is_none() {
        debug!(method = %req.method, "notification received");
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(state, req.id),
        "ping" => MCPResponse::success(req.id, json!({})),
        "tools/list" => handle_tools_list(&state.registry, req.id),
        "tools/call" => handle_tools_call(&state.registry, req.id, req.params).await,
        _ => MCPResponse::failure(
            req.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };
    Some(response)
}

/// Handle MCP initialize method.
fn handle_initialize(state: &AppState, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": state.server_name,
                "version": state.server_version
            }
        }),
    )
}

/// Handle MCP tools/list method.
fn handle_tools_list(registry: &ToolRegistry, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(id, json!({ "tools": registry.tools() }))
}

/// Handle MCP tools/call method.
///
/// A handler error is still a successful JSON-RPC response: the failure is
/// reported inside the result with `isError: true`. Only a malformed call or an
/// unknown tool produce JSON-RPC errors.
async fn handle_tools_call(
    registry: &ToolRegistry,
    id: Option<Value>,
    params: Option<Value>,
) -> MCPResponse {
    let Some(params) = params else {
        return MCPResponse::failure(id, INVALID_PARAMS, "Invalid params".to_string());
    };

    let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    let Some(call) = registry.call(tool_name, arguments) else {
        return MCPResponse::failure(id, METHOD_NOT_FOUND, format!("Unknown tool: {}", tool_name));
    };

    debug!(tool = tool_name, "calling tool");
    match call.await {
        Ok(text) => MCPResponse::success(id, tool_content(text, false)),
        Err(e) => {
            warn!(tool = tool_name, error = %e, "tool call failed");
            MCPResponse::success(id, tool_content(format!("Error: {}", e), true))
        }
    }
}

fn tool_content(text: String, is_error: bool) -> Value {
    json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "isError": is_error
    })
}

/// Health check endpoint handler.
async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": state.server_name
    }))
}

/// MCP JSON-RPC request handler for HTTP mode.
///
/// Notifications are acknowledged with `202 Accepted` and an empty body.
async fn mcp_handler(state: web::Data<AppState>, req: web::Json<MCPRequest>) -> HttpResponse {
    match handle_request(&state, req.into_inner()).await {
        Some(response) => HttpResponse::Ok().json(response),
        None => HttpResponse::Accepted().finish(),
    }
}

/// Route table for HTTP mode, shared with the route tests.
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/mcp", web::post().to(mcp_handler))
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(health));
}

/// Run the MCP server in HTTP mode.
///
/// # Configuration
/// - Worker threads: from config (CPU count, max 16, by default)
/// - Max connections: 10,000 concurrent connections
/// - Keep-alive: 30 seconds
/// - Request timeout: 30 seconds
/// - Shutdown timeout: 10 seconds
pub async fn run_server_http(state: AppState, host: &str, port: u16, workers: usize) -> std::io::Result<()> {
    use std::time::Duration;

    let bind_addr = format!("{}:{}", host, port);

    info!(
        name = %state.server_name,
        version = %state.server_version,
        bind = %bind_addr,
        workers,
        tools = state.registry.tools().len(),
        "MCP server starting (HTTP mode)"
    );

    let app_state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure_routes)
    })
    .workers(workers)
    .max_connections(10000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode on the process's stdin/stdout.
pub async fn run_server_stdio(state: AppState) -> std::io::Result<()> {
    use tokio::io::{BufReader, BufWriter};

    info!(
        name = %state.server_name,
        version = %state.server_version,
        tools = state.registry.tools().len(),
        "MCP server starting (STDIO mode)"
    );

    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve_lines(stdin, stdout, state).await
}

/// Serve newline-delimited JSON-RPC from `reader` to `writer`.
///
/// Each request runs on its own task so a slow provider does not hold up other
/// requests; responses are written one per line as they complete. When input
/// ends, in-flight requests are drained before returning.
pub async fn serve_lines<R, W>(reader: R, mut writer: W, state: AppState) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut in_flight: JoinSet<Option<MCPResponse>> = JoinSet::new();
    let mut reading = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if reading => {
                let Some(line) = line? else {
                    reading = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<MCPRequest>(&line) {
                    Ok(req) => {
                        in_flight.spawn(answer(state.clone(), req));
                    }
                    Err(e) => {
                        warn!(error = %e, "unparseable request line");
                        if let Some(response) = parse_error_response(&line, &e) {
                            write_response(&mut writer, &response).await?;
                        }
                    }
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok(Some(response)) => write_response(&mut writer, &response).await?,
                    Ok(None) => {}
                    Err(e) => error!(error = %e, "request task failed"),
                }
            }
            else => break,
        }
    }

    writer.flush().await
}

/// Run one request on its own task. A panicking handler still answers the
/// caller with an internal error instead of leaving the id unanswered.
async fn answer(state: AppState, req: MCPRequest) -> Option<MCPResponse> {
    let id = req.id.clone();
    match AssertUnwindSafe(handle_request(&state, req)).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            error!(id = ?id, "request handler panicked");
            id.map(|id| MCPResponse::failure(Some(id), INTERNAL_ERROR, "Internal error".to_string()))
        }
    }
}

/// Build a parse error response, if the broken line still carries an id.
fn parse_error_response(line: &str, err: &serde_json::Error) -> Option<MCPResponse> {
    let partial: Value = serde_json::from_str(line).ok()?;
    let id = partial.get("id")?.clone();
    Some(MCPResponse::failure(
        Some(id),
        PARSE_ERROR,
        format!("Parse error: {}", err),
    ))
}

/// Write one response as a single line and flush it.
async fn write_response<W>(writer: &mut W, response: &MCPResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response_json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "failed to serialize response");
            return Ok(());
        }
    };
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
