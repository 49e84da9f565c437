//! OpenWeatherMap current-weather client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::{WeatherProvider, WeatherReading};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("weather API returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Clone)]
pub struct OpenWeatherMapClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenWeatherMapClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("ac-window-controller/0.1"),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    /// Fetch and parse the current weather, surfacing every failure
    pub async fn try_fetch(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let url = format!(
            "{}/data/2.5/weather",
            self.base_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .get(url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status));
        }

        let raw: RawWeather = resp.json().await?;
        let reading = raw.into_reading();
        debug!(
            city,
            temperature_c = reading.temperature_c,
            rain = reading.rain,
            humidity = reading.humidity,
            "parsed weather"
        );
        Ok(reading)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    async fn fetch(&self, location: &str) -> WeatherReading {
        match self.try_fetch(location).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, location, "weather lookup failed, using fallback reading");
                WeatherReading::FALLBACK
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawWeather {
    #[serde(default)]
    main: Option<RawMain>,
    #[serde(default)]
    weather: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
struct RawMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    #[serde(default)]
    main: String,
}

impl RawWeather {
    fn into_reading(self) -> WeatherReading {
        let fallback = WeatherReading::FALLBACK;
        let (temp, humidity) = match self.main {
            Some(m) => (m.temp, m.humidity),
            None => (None, None),
        };
        WeatherReading {
            temperature_c: temp.unwrap_or(fallback.temperature_c),
            rain: self
                .weather
                .first()
                .map(|c| c.main.eq_ignore_ascii_case("rain"))
                .unwrap_or(false),
            humidity: humidity
                .map(|h| h.round().max(0.0) as u32)
                .unwrap_or(fallback.humidity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenWeatherMapClient {
        OpenWeatherMapClient::new(server.uri(), "test-key".to_string(), Duration::from_secs(2))
            .unwrap()
    }

    #[tokio::test]
    async fn test_parses_rainy_reading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Tunis"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": { "temp": 18.4, "humidity": 87 },
                "weather": [{ "main": "Rain", "description": "light rain" }]
            })))
            .mount(&server)
            .await;

        let reading = client_for(&server).fetch("Tunis").await;
        assert_eq!(
            reading,
            WeatherReading {
                temperature_c: 18.4,
                rain: true,
                humidity: 87
            }
        );
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{ "main": "Clouds" }]
            })))
            .mount(&server)
            .await;

        let reading = client_for(&server).fetch("Tunis").await;
        assert_eq!(reading, WeatherReading::FALLBACK);
    }

    #[tokio::test]
    async fn test_http_error_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.try_fetch("Tunis").await,
            Err(WeatherError::Status(s)) if s.as_u16() == 500
        ));
        assert_eq!(client.fetch("Tunis").await, WeatherReading::FALLBACK);
    }

    #[tokio::test]
    async fn test_malformed_body_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).fetch("Tunis").await, WeatherReading::FALLBACK);
    }

    #[tokio::test]
    async fn test_slow_response_times_out_to_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "main": { "temp": 35.0, "humidity": 20 },
                        "weather": [{ "main": "Clear" }]
                    }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            OpenWeatherMapClient::new(server.uri(), "test-key".to_string(), Duration::from_millis(200))
                .unwrap();
        let started = std::time::Instant::now();
        assert_eq!(client.fetch("Tunis").await, WeatherReading::FALLBACK);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
