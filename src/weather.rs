//! Weather & Geocoding Clients
//!
//! Thin typed wrappers over the OpenWeatherMap current-weather endpoint and
//! the Nominatim search endpoint. Upstream failures and malformed payloads
//! degrade to typed errors so a handler can report them without crashing the
//! request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response from weather service")]
    InvalidPayload,

    #[error("weather service error: {0}")]
    Upstream(String),

    #[error("municipality has no coordinates")]
    MissingCoordinates,
}

/// Current conditions for a location, mapped from the upstream payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    /// Rain volume over the last 3 hours (mm); 0 when the payload carries
    /// no rain block.
    pub rainfall_mm: f64,
    pub description: String,
    pub wind_speed: f64,
}

/// Geographic coordinates resolved by the geocoder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// HTTP client for the weather and geocoding upstreams.
pub struct WeatherClient {
    http: reqwest::Client,
    api_key: String,
    weather_base_url: String,
    nominatim_base_url: String,
    geocode_country: String,
}

impl WeatherClient {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .user_agent("agroplan/1.0")
            .build()?;
        Ok(Self {
            http,
            api_key: config.openweather_api_key.clone(),
            weather_base_url: config.openweather_base_url.clone(),
            nominatim_base_url: config.nominatim_base_url.clone(),
            geocode_country: config.geocode_country.clone(),
        })
    }

    /// Fetch current conditions for a coordinate pair.
    pub async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherReport, WeatherError> {
        let url = format!("{}/data/2.5/weather", self.weather_base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("units", "metric".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|_| WeatherError::InvalidPayload)?;

        let main = payload.get("main");
        if !status.is_success() || main.is_none() {
            let message = payload
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no valid weather data")
                .to_string();
            tracing::warn!(status = %status, "weather upstream rejected request: {}", message);
            return Err(WeatherError::Upstream(message));
        }
        let main = main.and_then(|m| m.as_object()).ok_or(WeatherError::InvalidPayload)?;

        let temperature_c = main
            .get("temp")
            .and_then(|v| v.as_f64())
            .ok_or(WeatherError::InvalidPayload)?;
        let humidity_pct = main
            .get("humidity")
            .and_then(|v| v.as_f64())
            .ok_or(WeatherError::InvalidPayload)?;
        let rainfall_mm = payload
            .pointer("/rain/3h")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let description = payload
            .pointer("/weather/0/description")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let wind_speed = payload
            .pointer("/wind/speed")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        Ok(WeatherReport {
            temperature_c,
            humidity_pct,
            rainfall_mm,
            description,
            wind_speed,
        })
    }

    /// Resolve a municipality name to coordinates via Nominatim. Returns
    /// `None` when the geocoder has no match.
    pub async fn geocode(&self, name: &str) -> Result<Option<Coordinates>, WeatherError> {
        #[derive(Deserialize)]
        struct Place {
            lat: String,
            lon: String,
        }

        let url = format!("{}/search", self.nominatim_base_url);
        let query = format!("{}, {}", name, self.geocode_country);
        let places: Vec<Place> = self
            .http
            .get(&url)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .json()
            .await
            .map_err(|_| WeatherError::InvalidPayload)?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        let latitude = place
            .lat
            .parse()
            .map_err(|_| WeatherError::InvalidPayload)?;
        let longitude = place
            .lon
            .parse()
            .map_err(|_| WeatherError::InvalidPayload)?;
        Ok(Some(Coordinates {
            latitude,
            longitude,
        }))
    }
}
