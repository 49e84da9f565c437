//! Outdoor weather used by the environment when the window is opened.
//!
//! Providers never fail from the caller's point of view: any transport or
//! decode problem is logged and collapses to [`WeatherReading::FALLBACK`].

pub mod openweathermap;

pub use openweathermap::OpenWeatherMapClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outdoor conditions at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub rain: bool,
    pub humidity: u32,
}

impl WeatherReading {
    pub const FALLBACK: WeatherReading = WeatherReading {
        temperature_c: 24.0,
        rain: false,
        humidity: 50,
    };
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self::FALLBACK
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> WeatherReading;
}

/// Provider returning a constant reading, for offline runs
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWeather(pub WeatherReading);

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn fetch(&self, _location: &str) -> WeatherReading {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_weather() {
        let reading = WeatherReading {
            temperature_c: 31.5,
            rain: true,
            humidity: 80,
        };
        let provider = FixedWeather(reading);
        assert_eq!(provider.fetch("Tunis").await, reading);
    }

    #[test]
    fn test_default_is_fallback() {
        let reading = WeatherReading::default();
        assert_eq!(reading.temperature_c, 24.0);
        assert!(!reading.rain);
        assert_eq!(reading.humidity, 50);
    }
}
