//! Domain records for the farm-management service.
//!
//! Flat, id-referenced records mirroring the relational shape of the
//! production deployment: categories group products (crops), sowings tie a
//! farmer, a product and a municipality to a planting date, and price
//! records track market prices per product.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::viability::range::{IdealRange, Tolerance};

/// Record identifier used across all tables.
pub type Id = u64;

// ============================================================================
// Catalog
// ============================================================================

/// Crop category (e.g. "Cereals", "Vegetables"). Names are unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
}

/// A crop in the catalog, with the tolerance ranges the viability engine
/// scores against. All agronomic fields are optional: a product without a
/// complete temperature/rain/humidity range is still listable and sowable,
/// it just cannot be scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Id,
    pub category_id: Id,
    pub name: String,

    // Tolerance ranges
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_rain: Option<f64>,
    pub max_rain: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub min_altitude: Option<i32>,
    pub max_altitude: Option<i32>,

    /// Approximate days from sowing to harvest.
    pub cycle_days: Option<u32>,
    pub cost_per_hectare: Option<f64>,
    pub yield_per_hectare: Option<f64>,
}

impl Product {
    /// The complete tolerance envelope, or `None` if any of the six range
    /// bounds is missing.
    pub fn tolerance(&self) -> Option<Tolerance> {
        Some(Tolerance {
            temp: IdealRange::new(self.min_temp?, self.max_temp?),
            rain: IdealRange::new(self.min_rain?, self.max_rain?),
            humidity: IdealRange::new(self.min_humidity?, self.max_humidity?),
        })
    }
}

/// Fields accepted when creating or updating a product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub category_id: Id,
    pub name: String,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_rain: Option<f64>,
    pub max_rain: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub min_altitude: Option<i32>,
    pub max_altitude: Option<i32>,
    pub cycle_days: Option<u32>,
    pub cost_per_hectare: Option<f64>,
    pub yield_per_hectare: Option<f64>,
}

/// Municipality with optional coordinates. Coordinates are filled by the
/// geocoding backfill tool and are required for live weather lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Municipality {
    pub id: Id,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MunicipalityInput {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// ============================================================================
// Sowings
// ============================================================================

/// Lifecycle state of a sowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SowingStatus {
    Ongoing,
    Harvested,
    Failed,
}

impl SowingStatus {
    pub fn display_text(&self) -> &'static str {
        match self {
            SowingStatus::Ongoing => "Ongoing",
            SowingStatus::Harvested => "Harvested",
            SowingStatus::Failed => "Failed",
        }
    }
}

impl Default for SowingStatus {
    fn default() -> Self {
        SowingStatus::Ongoing
    }
}

/// Unit for the sown area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaUnit {
    Hectare,
}

impl Default for AreaUnit {
    fn default() -> Self {
        AreaUnit::Hectare
    }
}

/// A recorded planting: a farmer sowed `quantity` of `product` in
/// `municipality` on `sowing_date`. Harvest date and cost estimates are
/// derived from the product's cycle/cost fields at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sowing {
    pub id: Id,
    pub farmer_id: Id,
    pub product_id: Id,
    pub municipality_id: Id,
    pub quantity: f64,
    pub unit: AreaUnit,
    pub area: f64,
    pub sowing_date: NaiveDate,
    pub status: SowingStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_harvest_date: Option<NaiveDate>,
    pub estimated_cost: Option<f64>,
}

/// Fields accepted when registering a sowing. The farmer is taken from the
/// authenticated user, never from the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SowingInput {
    pub product_id: Id,
    pub municipality_id: Id,
    pub quantity: f64,
    #[serde(default)]
    pub unit: AreaUnit,
    #[serde(default = "default_area")]
    pub area: f64,
    pub sowing_date: NaiveDate,
    #[serde(default)]
    pub status: SowingStatus,
}

fn default_area() -> f64 {
    1.0
}

// ============================================================================
// Prices
// ============================================================================

/// Unit of measure for a recorded market price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    Kilo,
    Tonne,
    Arroba,
}

/// Market price observation for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: Id,
    pub product_id: Id,
    pub value: f64,
    pub quantity: f64,
    pub unit: PriceUnit,
    pub date: DateTime<Utc>,
    pub user_id: Option<Id>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceInput {
    pub product_id: Id,
    pub value: f64,
    pub quantity: f64,
    pub unit: PriceUnit,
    pub date: DateTime<Utc>,
}

// ============================================================================
// Users
// ============================================================================

/// Access role. Farmers manage their own sowings; admins see everything and
/// own the aggregate dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Farmer
    }
}

/// Public user record. Credentials live in the authenticator, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_with_ranges() -> Product {
        Product {
            id: 1,
            category_id: 1,
            name: "Tomato".to_string(),
            min_temp: Some(18.0),
            max_temp: Some(28.0),
            min_rain: Some(1.0),
            max_rain: Some(8.0),
            min_humidity: Some(40.0),
            max_humidity: Some(70.0),
            min_altitude: None,
            max_altitude: None,
            cycle_days: Some(90),
            cost_per_hectare: Some(2_500_000.0),
            yield_per_hectare: Some(30.0),
        }
    }

    #[test]
    fn tolerance_requires_all_six_bounds() {
        let full = product_with_ranges();
        assert!(full.tolerance().is_some());

        let mut partial = product_with_ranges();
        partial.max_humidity = None;
        assert!(partial.tolerance().is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&SowingStatus::Harvested).unwrap();
        assert_eq!(json, "\"harvested\"");
    }
}
