//! Harvest Estimation
//!
//! Derives the expected harvest date, cost and yield for a sowing from the
//! product's agronomic fields. Every estimate is optional: products without
//! cycle or cost data simply yield no estimate.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::Product;

/// Derived estimates for a sowing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HarvestEstimate {
    /// Sowing date plus the product's cycle length.
    pub harvest_date: Option<NaiveDate>,

    /// Area (hectares) times the product's cost per hectare.
    pub cost: Option<f64>,

    /// Area (hectares) times the product's yield per hectare.
    pub expected_yield: Option<f64>,
}

/// Estimate harvest date, cost and yield for `area_ha` hectares of a product
/// sown on `sowing_date`.
pub fn estimate(product: &Product, sowing_date: NaiveDate, area_ha: f64) -> HarvestEstimate {
    HarvestEstimate {
        harvest_date: product
            .cycle_days
            .map(|days| sowing_date + Duration::days(i64::from(days))),
        cost: product.cost_per_hectare.map(|cost| cost * area_ha),
        expected_yield: product.yield_per_hectare.map(|y| y * area_ha),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn product(cycle_days: Option<u32>, cost: Option<f64>, yield_ha: Option<f64>) -> Product {
        Product {
            id: 1,
            category_id: 1,
            name: "Beans".to_string(),
            min_temp: None,
            max_temp: None,
            min_rain: None,
            max_rain: None,
            min_humidity: None,
            max_humidity: None,
            min_altitude: None,
            max_altitude: None,
            cycle_days,
            cost_per_hectare: cost,
            yield_per_hectare: yield_ha,
        }
    }

    #[test]
    fn full_estimate() {
        let sown = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let est = estimate(&product(Some(90), Some(1_000_000.0), Some(4.5)), sown, 2.0);

        assert_eq!(
            est.harvest_date,
            Some(NaiveDate::from_ymd_opt(2024, 5, 30).unwrap())
        );
        assert_relative_eq!(est.cost.unwrap(), 2_000_000.0);
        assert_relative_eq!(est.expected_yield.unwrap(), 9.0);
    }

    #[test]
    fn missing_fields_yield_no_estimates() {
        let sown = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let est = estimate(&product(None, None, None), sown, 1.0);

        assert!(est.harvest_date.is_none());
        assert!(est.cost.is_none());
        assert!(est.expected_yield.is_none());
    }

    #[test]
    fn cycle_crosses_year_boundary() {
        let sown = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let est = estimate(&product(Some(60), None, None), sown, 1.0);

        assert_eq!(
            est.harvest_date,
            Some(NaiveDate::from_ymd_opt(2025, 1, 30).unwrap())
        );
    }
}
