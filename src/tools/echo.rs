/// Echo Tool
///
/// `my_tool` wraps its input in a fixed sentence. It makes no external call and
/// is useful for checking that a client can reach the server at all.

use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::Value;

use super::parse_args;
use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};

pub fn my_tool(input_string: &str) -> String {
    format!("This is a test tool that returns the input string: {input_string}")
}

#[derive(Debug, Deserialize)]
struct EchoArgs {
    input_string: String,
}

async fn invoke(args: Value) -> Result<String, ToolError> {
    let EchoArgs { input_string } = parse_args(args)?;
    Ok(my_tool(&input_string))
}

pub fn register(registry: &mut ToolRegistry) {
    let tool = MCPTool {
        name: "my_tool".to_string(),
        description: "Return a fixed sentence containing the input string.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "input_string": {
                    "type": "string",
                    "description": "Text to echo back"
                }
            },
            "required": ["input_string"]
        }),
    };

    let handler: ToolHandler = Box::new(|args| invoke(args).boxed());
    registry.register(tool, handler);
}
