/// Core Server Framework Module
///
/// - server.rs: MCP protocol types, tool registry, STDIO and HTTP transports
/// - config.rs: configuration from environment variables
/// - error.rs: tool and startup error types

pub mod config;
pub mod error;
pub mod server;
