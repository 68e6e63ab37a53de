/// Tools Module
///
/// Each tool lives in its own module and exports a `register` function.
/// `build_registry` wires them all into the table the transports dispatch on.

pub mod alerts;
pub mod echo;
pub mod forecast;
pub mod nws;
pub mod open_meteo;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::Config;
use crate::core::error::{ServerError, ToolError};
use crate::core::server::ToolRegistry;
use nws::NwsClient;
use open_meteo::OpenMeteoClient;

/// Build the tool table once at startup.
///
/// HTTP clients are created here and moved into the handlers that use them.
pub fn build_registry(config: &Config) -> Result<ToolRegistry, ServerError> {
    let nws = NwsClient::new(config.nws_api_base.clone())?;
    let open_meteo = OpenMeteoClient::new(config.open_meteo_api_base.clone())?;

    let mut registry = ToolRegistry::new();
    alerts::register(&mut registry, nws.clone());
    forecast::register(&mut registry, nws);
    open_meteo::register(&mut registry, open_meteo);
    echo::register(&mut registry);

    Ok(registry)
}

/// Decode a tool's `arguments` object into its typed form.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    Ok(serde_json::from_value(args)?)
}

/// Text for one provider field: strings as sent, other JSON values in their
/// JSON form, absent or `null` fields as `fallback`.
pub(crate) fn field_text(value: Option<&Value>, fallback: &str) -> String {
    match value {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render a coordinate for a URL the way Python's `repr(float)` does, which is
/// the form the provider URLs were first documented with: whole numbers keep
/// one decimal place (`40.0`), magnitudes below `1e-4` or from `1e16` up switch
/// to exponent form with a signed two-digit exponent (`1e-05`), everything
/// else uses the shortest exact form (`39.7456`).
pub(crate) fn format_coordinate(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => text,
        };
    }

    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Input schema shared by the latitude/longitude tools.
fn coordinate_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "lat": {
                "type": "number",
                "description": "Latitude of the location"
            },
            "lon": {
                "type": "number",
                "description": "Longitude of the location"
            }
        },
        "required": ["lat", "lon"]
    })
}
