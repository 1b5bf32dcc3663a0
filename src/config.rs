//! Environment-driven configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server.
    pub addr: SocketAddr,

    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub nominatim_base_url: String,

    /// Country suffix appended to geocoding queries.
    pub geocode_country: String,

    /// Directory with `products.csv` / `municipalities.csv` seed files.
    pub seed_dir: Option<PathBuf>,
}

impl Config {
    /// Read configuration from the environment, falling back to local
    /// development defaults.
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            openweather_api_key: std::env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
            openweather_base_url: std::env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            nominatim_base_url: std::env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            geocode_country: std::env::var("GEOCODE_COUNTRY")
                .unwrap_or_else(|_| "Colombia".to_string()),
            seed_dir: std::env::var("SEED_DIR").ok().map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            openweather_api_key: String::new(),
            openweather_base_url: "https://api.openweathermap.org".to_string(),
            nominatim_base_url: "https://nominatim.openstreetmap.org".to_string(),
            geocode_country: "Colombia".to_string(),
            seed_dir: None,
        }
    }
}
