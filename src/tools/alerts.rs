/// Weather Alerts Tool
///
/// `get_weather_alerts` lists the active NWS alerts for a US state. It never
/// fails: a missing or broken provider response becomes a fixed sentence.

use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::nws::NwsClient;
use super::{field_text, parse_args};
use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};

pub const ALERTS_UNAVAILABLE: &str = "No alerts found or unable to fetch alerts";
pub const NO_ACTIVE_ALERTS: &str = "No active weather alerts for the specified state.";

const ALERT_SEPARATOR: &str = "\n----\n";

/// One entry of the alerts document's `features` array.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AlertFeature {
    pub properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertProperties {
    pub event: Option<Value>,
    pub area_desc: Option<Value>,
    pub severity: Option<Value>,
    pub description: Option<Value>,
    pub instruction: Option<Value>,
}

impl AlertFeature {
    /// Decode a feature. Fields keep whatever JSON the provider sent; only a
    /// feature that is not an object at all decodes as one with no fields.
    fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_else(|e| {
            warn!(error = %e, "unreadable alert feature");
            Self::default()
        })
    }
}

/// Render one alert. Absent fields get their fallback text.
pub fn format_alert(feature: &AlertFeature) -> String {
    let props = &feature.properties;
    format!(
        "Event: {}\nArea: {}\nSeverity: {}\nDescription: {}\nInstructions: {}",
        field_text(props.event.as_ref(), "Unknown"),
        field_text(props.area_desc.as_ref(), "Unknown"),
        field_text(props.severity.as_ref(), "Unknown"),
        field_text(props.description.as_ref(), "No description available"),
        field_text(props.instruction.as_ref(), "No specific instructions provided"),
    )
}

pub async fn get_weather_alerts(nws: &NwsClient, state: &str) -> String {
    let Some(data) = nws.fetch(&nws.alerts_url(state)).await else {
        return ALERTS_UNAVAILABLE.to_string();
    };

    match data.get("features") {
        Some(Value::Array(features)) if !features.is_empty() => features
            .iter()
            .map(|feature| format_alert(&AlertFeature::from_value(feature)))
            .collect::<Vec<_>>()
            .join(ALERT_SEPARATOR),
        Some(Value::Array(_)) | Some(Value::Null) => NO_ACTIVE_ALERTS.to_string(),
        _ => ALERTS_UNAVAILABLE.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct AlertsArgs {
    state: String,
}

async fn invoke(nws: NwsClient, args: Value) -> Result<String, ToolError> {
    let AlertsArgs { state } = parse_args(args)?;
    Ok(get_weather_alerts(&nws, &state).await)
}

pub fn register(registry: &mut ToolRegistry, nws: NwsClient) {
    let tool = MCPTool {
        name: "get_weather_alerts".to_string(),
        description: "Get weather alerts for a US state.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "state": {
                    "type": "string",
                    "description": "Two letter state code (e.g. 'CA' for California)"
                }
            },
            "required": ["state"]
        }),
    };

    let handler: ToolHandler = Box::new(move |args| invoke(nws.clone(), args).boxed());
    registry.register(tool, handler);
}
