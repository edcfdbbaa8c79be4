//! Point weather lookup.
//!
//! Produces a short human-readable description that is pasted into the
//! outfit prompt as-is.

use async_trait::async_trait;
use closet_model::Coordinates;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::http::{ensure_success, trim_base};

pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

const PROVIDER: &str = "openweather";

/// Coordinates in, short weather description out.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn describe(&self, coordinates: Coordinates) -> Result<String>;
}

/// Connection settings for OpenWeatherMap
#[derive(Debug, Clone)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl OpenWeatherConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_OPENWEATHER_BASE_URL.to_string(),
        }
    }
}

/// Client for the OpenWeatherMap current-weather endpoint.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    config: OpenWeatherConfig,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<Condition>,
    main: Readings,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: Option<f64>,
    humidity: Option<f64>,
}

impl CurrentWeather {
    fn describe(&self) -> String {
        let condition = self
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown conditions");
        let mut text = format!("{condition}, {:.0}°C", self.main.temp);
        if let Some(feels_like) = self.main.feels_like {
            text.push_str(&format!(" (feels like {feels_like:.0}°C)"));
        }
        if let Some(humidity) = self.main.humidity {
            text.push_str(&format!(", humidity {humidity:.0}%"));
        }
        text
    }
}

impl OpenWeatherClient {
    pub fn new(http: reqwest::Client, config: OpenWeatherConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl WeatherLookup for OpenWeatherClient {
    async fn describe(&self, coordinates: Coordinates) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ProviderError::MissingCredential {
                provider: PROVIDER,
                variable: "OPENWEATHER_API_KEY",
            })?;

        let response = self
            .http
            .get(format!("{}/data/2.5/weather", trim_base(&self.config.base_url)))
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;
        let current: CurrentWeather = ensure_success(PROVIDER, response).await?.json().await?;

        let description = current.describe();
        debug!(
            lat = coordinates.latitude,
            lon = coordinates.longitude,
            %description,
            "Weather lookup complete"
        );
        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_full_reading() {
        let current: CurrentWeather = serde_json::from_value(json!({
            "weather": [{"description": "light rain"}],
            "main": {"temp": 13.6, "feels_like": 12.2, "humidity": 81}
        }))
        .unwrap();
        assert_eq!(
            current.describe(),
            "light rain, 14°C (feels like 12°C), humidity 81%"
        );
    }

    #[test]
    fn test_describe_minimal_reading() {
        let current: CurrentWeather =
            serde_json::from_value(json!({"main": {"temp": -2.4}})).unwrap();
        assert_eq!(current.describe(), "unknown conditions, -2°C");
    }
}
