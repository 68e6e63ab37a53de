/// Hourly Forecast Tool (Open-Meteo)
///
/// `get_indian_forecast` returns the provider's hourly temperature document as
/// text, untouched. Unlike the NWS tools it does not mask failures: transport
/// and decoding errors reach the caller as tool errors. The HTTP status is not
/// inspected, so a JSON error body from the provider comes back as text.

use std::time::Duration;

use futures_util::FutureExt;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::forecast::CoordinateArgs;
use super::{format_coordinate, parse_args};
use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};

/// Matches the implicit default of the HTTP client this tool was first written against.
pub const OPEN_METEO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(OPEN_METEO_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn hourly_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/v1/forecast?latitude={}&longitude={}&hourly=temperature_2m",
            self.base_url,
            format_coordinate(lat),
            format_coordinate(lon)
        )
    }
}

pub async fn get_indian_forecast(client: &OpenMeteoClient, lat: f64, lon: f64) -> Result<String, ToolError> {
    let url = client.hourly_url(lat, lon);
    debug!(url = %url, "fetching hourly forecast");

    let response = match client.http.get(&url).send().await {
        Ok(response) => response,
        Err(source) => return Err(ToolError::Request { url, source }),
    };
    let data: Value = match response.json().await {
        Ok(data) => data,
        Err(source) => return Err(ToolError::Request { url, source }),
    };

    Ok(data.to_string())
}

async fn invoke(client: OpenMeteoClient, args: Value) -> Result<String, ToolError> {
    let CoordinateArgs { lat, lon } = parse_args(args)?;
    get_indian_forecast(&client, lat, lon).await
}

pub fn register(registry: &mut ToolRegistry, client: OpenMeteoClient) {
    let tool = MCPTool {
        name: "get_indian_forecast".to_string(),
        description: "Get the hourly temperature forecast for a latitude and longitude from Open-Meteo."
            .to_string(),
        input_schema: super::coordinate_schema(),
    };

    let handler: ToolHandler = Box::new(move |args| invoke(client.clone(), args).boxed());
    registry.register(tool, handler);
}
