//! Agroplan — farm management service
//!
//! Farmers record plantings ("sowings"), the service fetches weather for a
//! municipality, scores how suitable a crop is for the observed conditions,
//! estimates harvest date/cost, and surfaces aggregate dashboards
//! (overplanting alerts, production distribution) to administrators.
//!
//! Module layout:
//! - `models`: domain records (categories, products, municipalities,
//!   sowings, prices, users)
//! - `store`: in-memory tables with uniqueness/referential checks
//! - `viability`: the scoring engine (range fit, saturation, alternatives)
//! - `harvest`: harvest date/cost estimation
//! - `stats`: admin dashboard aggregation and overplanting alerts
//! - `weather`: OpenWeatherMap + Nominatim clients
//! - `auth`: accounts, roles and bearer sessions
//! - `api_server`: axum router and handlers
//! - `web`: server-rendered pages

pub mod api_server;
pub mod auth;
pub mod config;
pub mod harvest;
pub mod models;
pub mod seed;
pub mod stats;
pub mod store;
pub mod viability;
pub mod weather;
pub mod web;

// Re-export commonly used types
pub use api_server::{create_router, AppState};
pub use config::Config;
