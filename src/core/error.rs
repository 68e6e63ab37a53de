/// Error Types
///
/// `ToolError` is what a tool handler may return to the dispatcher. It becomes an
/// MCP tool result with `isError: true`, never a JSON-RPC error and never a crash.
/// `ServerError` covers everything that can stop the process from starting.

use thiserror::Error;

/// Failure of a single tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The `arguments` object did not match the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    /// An outbound request failed and the tool does not mask failures.
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Startup failure of the server process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
