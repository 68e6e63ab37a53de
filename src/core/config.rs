/// Server Configuration
///
/// All settings come from environment variables read once at startup. Every
/// variable is optional; the defaults reproduce the public provider endpoints and
/// run the server on STDIO.
///
/// Environment Variables:
/// - SERVER_NAME: Name reported in `initialize` (default: "weather_service")
/// - SERVER_VERSION: Version reported in `initialize` (default: crate version)
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "stdio")
/// - HOST: Bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: Port number for HTTP mode (default: 3000)
/// - WORKER_THREADS: HTTP worker count (default: CPU count, max 16)
/// - NWS_API_BASE: National Weather Service base URL (default: "https://api.weather.gov")
/// - OPEN_METEO_API_BASE: Open-Meteo base URL (default: "https://api.open-meteo.com")

use std::fmt;
use std::str::FromStr;

use crate::core::error::ServerError;

pub const DEFAULT_SERVER_NAME: &str = "weather_service";
pub const DEFAULT_NWS_API_BASE: &str = "https://api.weather.gov";
pub const DEFAULT_OPEN_METEO_API_BASE: &str = "https://api.open-meteo.com";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const MAX_DEFAULT_WORKERS: usize = 16;

/// Which transports the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    Http,
    Both,
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            "both" => Ok(TransportMode::Both),
            _ => Err("must be 'stdio', 'http', or 'both'".to_string()),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportMode::Stdio => "stdio",
            TransportMode::Http => "http",
            TransportMode::Both => "both",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Base URL of the alerts/forecast provider, without trailing slash.
    pub nws_api_base: String,
    /// Base URL of the hourly forecast provider, without trailing slash.
    pub open_meteo_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            transport: TransportMode::Stdio,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS),
            nws_api_base: DEFAULT_NWS_API_BASE.to_string(),
            open_meteo_api_base: DEFAULT_OPEN_METEO_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset variables fall back to defaults; set but unparseable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let workers = match parse_var::<usize, _>(&lookup, "WORKER_THREADS")? {
            Some(0) => {
                return Err(ServerError::InvalidConfig {
                    key: "WORKER_THREADS",
                    value: "0".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            Some(n) => n,
            None => defaults.workers,
        };

        Ok(Self {
            server_name: lookup("SERVER_NAME").unwrap_or(defaults.server_name),
            server_version: lookup("SERVER_VERSION").unwrap_or(defaults.server_version),
            transport: parse_var(&lookup, "MCP_TRANSPORT_MODE")?.unwrap_or(defaults.transport),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            workers,
            nws_api_base: lookup("NWS_API_BASE")
                .map(|url| trim_base_url(&url))
                .unwrap_or(defaults.nws_api_base),
            open_meteo_api_base: lookup("OPEN_METEO_API_BASE")
                .map(|url| trim_base_url(&url))
                .unwrap_or(defaults.open_meteo_api_base),
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ServerError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(ServerError::InvalidConfig {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
