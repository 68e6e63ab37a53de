/// National Weather Service Client
///
/// Thin fetch helper shared by the alert and forecast tools. Every request
/// carries the same identifying headers and a 30 second timeout. Failures of
/// any kind collapse to `None`; callers only ever see "no result".

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use super::format_coordinate;

pub const NWS_USER_AGENT: &str = "weather-app/1.0";
pub const NWS_ACCEPT: &str = "application/geo+json";
pub const NWS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct NwsClient {
    http: Client,
    base_url: String,
}

impl NwsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(NWS_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(NWS_ACCEPT));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(NWS_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Active alerts for an area. The area code is forwarded verbatim.
    pub fn alerts_url(&self, state: &str) -> String {
        format!("{}/alerts/active/area/{}", self.base_url, state)
    }

    /// Points lookup whose response names the gridpoint forecast URL.
    pub fn points_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/points/{},{}/forecast",
            self.base_url,
            format_coordinate(lat),
            format_coordinate(lon)
        )
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Returns `None` on connection errors, timeouts, non-2xx statuses and
    /// undecodable bodies alike.
    pub async fn fetch(&self, url: &str) -> Option<Value> {
        debug!(url, "fetching");
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "request failed");
                return None;
            }
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "provider returned an error status");
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url, error = %e, "response body is not JSON");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn urls_are_built_from_base() {
        let nws = NwsClient::new("http://nws.test").expect("client builds");

        assert_eq!(nws.alerts_url("CA"), "http://nws.test/alerts/active/area/CA");
        assert_eq!(
            nws.points_url(40.0, -75.0),
            "http://nws.test/points/40.0,-75.0/forecast"
        );
        assert_eq!(
            nws.points_url(39.7456, -97.0892),
            "http://nws.test/points/39.7456,-97.0892/forecast"
        );
    }

    #[tokio::test]
    async fn fetch_sends_identifying_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts/active/area/TX"))
            .and(header("user-agent", NWS_USER_AGENT))
            .and(header("accept", NWS_ACCEPT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
            .expect(1)
            .mount(&server)
            .await;

        let nws = NwsClient::new(server.uri()).expect("client builds");
        let body = nws.fetch(&nws.alerts_url("TX")).await;

        assert_eq!(body, Some(json!({"features": []})));
    }

    #[tokio::test]
    async fn fetch_yields_none_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "down"})))
            .mount(&server)
            .await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(nws.fetch(&nws.alerts_url("TX")).await, None);
    }

    #[tokio::test]
    async fn fetch_yields_none_on_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let nws = NwsClient::new(server.uri()).expect("client builds");

        assert_eq!(nws.fetch(&nws.alerts_url("TX")).await, None);
    }

    #[tokio::test]
    async fn fetch_yields_none_when_unreachable() {
        // Nothing listens on the discard port.
        let nws = NwsClient::new("http://127.0.0.1:9").expect("client builds");

        assert_eq!(nws.fetch(&nws.alerts_url("TX")).await, None);
    }
}
