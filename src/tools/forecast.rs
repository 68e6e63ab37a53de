/// Forecast Tool
///
/// `get_forecast` resolves a coordinate to its NWS gridpoint forecast and
/// renders the next three periods. The gridpoint request is only made once the
/// points lookup has produced a forecast URL.

use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::nws::NwsClient;
use super::{field_text, parse_args};
use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};

pub const FORECAST_UNAVAILABLE: &str = "Unable to fetch forecast data.";

const PERIOD_SEPARATOR: &str = "\n---\n";
const MAX_PERIODS: usize = 3;

/// One entry of `properties.periods` in a gridpoint forecast.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub name: Option<Value>,
    pub temperature: Option<Value>,
    pub temperature_unit: Option<Value>,
    pub wind_speed: Option<Value>,
    pub wind_direction: Option<Value>,
    pub detailed_forecast: Option<Value>,
}

impl ForecastPeriod {
    fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_else(|e| {
            warn!(error = %e, "unreadable forecast period");
            Self::default()
        })
    }
}

pub fn format_period(period: &ForecastPeriod) -> String {
    format!(
        "{}:\nTemperature: {}°{}\nWind: {} {}\nForecast: {}",
        field_text(period.name.as_ref(), "Unknown"),
        field_text(period.temperature.as_ref(), "Unknown"),
        field_text(period.temperature_unit.as_ref(), "Unknown"),
        field_text(period.wind_speed.as_ref(), "Unknown"),
        field_text(period.wind_direction.as_ref(), "Unknown"),
        field_text(period.detailed_forecast.as_ref(), "No detailed forecast available"),
    )
}

pub async fn get_forecast(nws: &NwsClient, lat: f64, lon: f64) -> String {
    let Some(points) = nws.fetch(&nws.points_url(lat, lon)).await else {
        return FORECAST_UNAVAILABLE.to_string();
    };

    let Some(forecast_url) = points.pointer("/properties/forecast").and_then(Value::as_str) else {
        debug!(lat, lon, "points response has no forecast URL");
        return FORECAST_UNAVAILABLE.to_string();
    };

    let Some(forecast) = nws.fetch(forecast_url).await else {
        return FORECAST_UNAVAILABLE.to_string();
    };

    let Some(periods) = forecast.pointer("/properties/periods").and_then(Value::as_array) else {
        debug!(url = forecast_url, "forecast response has no periods");
        return FORECAST_UNAVAILABLE.to_string();
    };

    periods
        .iter()
        .take(MAX_PERIODS)
        .map(|period| format_period(&ForecastPeriod::from_value(period)))
        .collect::<Vec<_>>()
        .join(PERIOD_SEPARATOR)
}

/// Coordinates shared by both forecast tools.
#[derive(Debug, Deserialize)]
pub(super) struct CoordinateArgs {
    pub lat: f64,
    pub lon: f64,
}

async fn invoke(nws: NwsClient, args: Value) -> Result<String, ToolError> {
    let CoordinateArgs { lat, lon } = parse_args(args)?;
    Ok(get_forecast(&nws, lat, lon).await)
}

pub fn register(registry: &mut ToolRegistry, nws: NwsClient) {
    let tool = MCPTool {
        name: "get_forecast".to_string(),
        description: "Get the weather forecast for a specific latitude and longitude.".to_string(),
        input_schema: super::coordinate_schema(),
    };

    let handler: ToolHandler = Box::new(move |args| invoke(nws.clone(), args).boxed());
    registry.register(tool, handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POINTS_PATH: &str = "/points/40.0,-75.0/forecast";
    const GRID_PATH: &str = "/gridpoints/PHI/50,75/forecast";

    fn period(name: &str, temperature: Value) -> Value {
        json!({
            "name": name,
            "temperature": temperature,
            "temperatureUnit": "F",
            "windSpeed": "10 mph",
            "windDirection": "NW",
            "detailedForecast": format!("{name} detail.")
        })
    }

    async fn mount_points(server: &MockServer, body: Value) {
        Mock::given(method("GET"))
            .and(path(POINTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_grid(server: &MockServer, status: u16, body: Value, calls: u64) {
        Mock::given(method("GET"))
            .and(path(GRID_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(calls)
            .mount(server)
            .await;
    }

    fn points_body(server: &MockServer) -> Value {
        json!({"properties": {"forecast": format!("{}{}", server.uri(), GRID_PATH)}})
    }

    #[test]
    fn format_period_renders_template() {
        let text = format_period(&ForecastPeriod::from_value(&period("Tonight", json!(54))));

        assert_eq!(
            text,
            "Tonight:\nTemperature: 54°F\nWind: 10 mph NW\nForecast: Tonight detail."
        );
    }

    #[test]
    fn format_period_keeps_fractional_temperature_and_falls_back() {
        let text = format_period(&ForecastPeriod::from_value(&json!({"temperature": 12.5})));

        assert_eq!(
            text,
            "Unknown:\nTemperature: 12.5°Unknown\nWind: Unknown Unknown\n\
             Forecast: No detailed forecast available"
        );
    }

    #[test]
    fn quantitative_temperature_keeps_the_rest_of_the_period() {
        let text = format_period(&ForecastPeriod::from_value(&json!({
            "name": "Tonight",
            "temperature": {"unitCode": "wmoUnit:degC", "value": 12},
            "temperatureUnit": "C",
            "windSpeed": "5 mph",
            "windDirection": "S",
            "detailedForecast": "Clear."
        })));

        assert_eq!(
            text,
            "Tonight:\nTemperature: {\"unitCode\":\"wmoUnit:degC\",\"value\":12}°C\n\
             Wind: 5 mph S\nForecast: Clear."
        );
    }

    #[tokio::test]
    async fn non_string_forecast_url_skips_second_fetch() {
        let server = MockServer::start().await;
        mount_points(&server, json!({"properties": {"forecast": 42}})).await;
        mount_grid(&server, 200, json!({}), 0).await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(get_forecast(&nws, 40.0, -75.0).await, FORECAST_UNAVAILABLE);
    }

    #[tokio::test]
    async fn empty_period_list_renders_nothing() {
        let server = MockServer::start().await;
        mount_points(&server, points_body(&server)).await;
        mount_grid(&server, 200, json!({"properties": {"periods": []}}), 1).await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(get_forecast(&nws, 40.0, -75.0).await, "");
    }

    #[tokio::test]
    async fn missing_forecast_url_skips_second_fetch() {
        let server = MockServer::start().await;
        mount_points(&server, json!({"properties": {}})).await;
        mount_grid(&server, 200, json!({}), 0).await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(get_forecast(&nws, 40.0, -75.0).await, FORECAST_UNAVAILABLE);
        assert_eq!(server.received_requests().await.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn failed_points_lookup_skips_second_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(POINTS_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        mount_grid(&server, 200, json!({}), 0).await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(get_forecast(&nws, 40.0, -75.0).await, FORECAST_UNAVAILABLE);
    }

    #[tokio::test]
    async fn failed_forecast_fetch_is_unavailable() {
        let server = MockServer::start().await;
        mount_points(&server, points_body(&server)).await;
        mount_grid(&server, 500, json!({}), 1).await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(get_forecast(&nws, 40.0, -75.0).await, FORECAST_UNAVAILABLE);
    }

    #[tokio::test]
    async fn empty_forecast_document_is_unavailable() {
        let server = MockServer::start().await;
        mount_points(&server, points_body(&server)).await;
        mount_grid(&server, 200, json!({}), 1).await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(get_forecast(&nws, 40.0, -75.0).await, FORECAST_UNAVAILABLE);
    }

    #[tokio::test]
    async fn at_most_three_periods_are_rendered() {
        let server = MockServer::start().await;
        mount_points(&server, points_body(&server)).await;
        let periods: Vec<Value> = ["Today", "Tonight", "Monday", "Monday Night", "Tuesday"]
            .iter()
            .map(|name| period(name, json!(60)))
            .collect();
        mount_grid(&server, 200, json!({"properties": {"periods": periods}}), 1).await;

        let nws = NwsClient::new(server.uri()).expect("client builds");
        let text = get_forecast(&nws, 40.0, -75.0).await;
        let blocks: Vec<&str> = text.split("\n---\n").collect();

        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].starts_with("Today:"));
        assert!(blocks[1].starts_with("Tonight:"));
        assert!(blocks[2].starts_with("Monday:"));
        assert!(!text.contains("Tuesday"));
    }

    #[tokio::test]
    async fn fewer_periods_are_rendered_without_error() {
        let server = MockServer::start().await;
        mount_points(&server, points_body(&server)).await;
        mount_grid(
            &server,
            200,
            json!({"properties": {"periods": [period("Overnight", json!(41))]}}),
            1,
        )
        .await;

        let nws = NwsClient::new(server.uri()).expect("client builds");
        let text = get_forecast(&nws, 40.0, -75.0).await;

        assert_eq!(
            text,
            "Overnight:\nTemperature: 41°F\nWind: 10 mph NW\nForecast: Overnight detail."
        );
    }
}
