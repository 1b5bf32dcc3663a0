//! Sowing Statistics
//!
//! Aggregations behind the administrator dashboard: distribution of sowings
//! by product, category and municipality (counts and percentages), plus
//! overplanting alerts for products whose share of the recorded sowings
//! exceeds a threshold.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::models::{Category, Id, Municipality, Product, Sowing};

/// Default share of total sowings above which an overplanting alert fires.
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.6;

/// One row of a distribution table.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionEntry {
    pub name: String,
    pub count: usize,
    pub percent: f64,
}

/// Alert raised when a single product dominates the recorded sowings.
#[derive(Debug, Clone, Serialize)]
pub struct OverplantingAlert {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Aggregate dashboard payload.
#[derive(Debug, Clone, Serialize)]
pub struct SowingStats {
    pub total_sowings: usize,
    pub by_product: Vec<DistributionEntry>,
    pub by_category: Vec<DistributionEntry>,
    pub by_municipality: Vec<DistributionEntry>,
    pub alerts: Vec<OverplantingAlert>,
}

/// Build the dashboard aggregates over a set of sowings.
///
/// `threshold` is the overplanting share in `[0, 1]`. Unknown foreign keys
/// (a sowing referencing a product that has since disappeared) are grouped
/// under "unknown" rather than dropped, so totals stay consistent.
pub fn aggregate(
    sowings: &[Sowing],
    products: &[Product],
    categories: &[Category],
    municipalities: &[Municipality],
    threshold: f64,
) -> SowingStats {
    let product_names: FxHashMap<Id, &str> =
        products.iter().map(|p| (p.id, p.name.as_str())).collect();
    let category_names: FxHashMap<Id, &str> = categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();
    let product_category: FxHashMap<Id, Id> =
        products.iter().map(|p| (p.id, p.category_id)).collect();
    let municipality_names: FxHashMap<Id, &str> = municipalities
        .iter()
        .map(|m| (m.id, m.name.as_str()))
        .collect();

    let total = sowings.len();
    // Percentages divide by at least 1 so an empty store reports zeros
    // instead of NaN.
    let divisor = total.max(1) as f64;

    let mut by_product_counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut by_category_counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut by_municipality_counts: FxHashMap<&str, usize> = FxHashMap::default();

    for sowing in sowings {
        let product = product_names
            .get(&sowing.product_id)
            .copied()
            .unwrap_or("unknown");
        *by_product_counts.entry(product).or_default() += 1;

        let category = product_category
            .get(&sowing.product_id)
            .and_then(|cid| category_names.get(cid).copied())
            .unwrap_or("unknown");
        *by_category_counts.entry(category).or_default() += 1;

        let municipality = municipality_names
            .get(&sowing.municipality_id)
            .copied()
            .unwrap_or("unknown");
        *by_municipality_counts.entry(municipality).or_default() += 1;
    }

    let by_product = to_distribution(by_product_counts, divisor);
    let alerts = by_product
        .iter()
        .filter(|entry| entry.count as f64 / divisor >= threshold)
        .map(|entry| OverplantingAlert {
            kind: "overplanting".to_string(),
            message: format!("Overplanting of {} ({}%)", entry.name, entry.percent),
        })
        .collect();

    SowingStats {
        total_sowings: total,
        by_product,
        by_category: to_distribution(by_category_counts, divisor),
        by_municipality: to_distribution(by_municipality_counts, divisor),
        alerts,
    }
}

/// Sort counts into a distribution table, largest groups first.
fn to_distribution(counts: FxHashMap<&str, usize>, divisor: f64) -> Vec<DistributionEntry> {
    let mut entries: Vec<DistributionEntry> = counts
        .into_iter()
        .map(|(name, count)| DistributionEntry {
            name: name.to_string(),
            count,
            percent: round2(count as f64 / divisor * 100.0),
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use crate::models::{AreaUnit, SowingStatus};

    fn category(id: Id, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
        }
    }

    fn product(id: Id, category_id: Id, name: &str) -> Product {
        Product {
            id,
            category_id,
            name: name.to_string(),
            min_temp: None,
            max_temp: None,
            min_rain: None,
            max_rain: None,
            min_humidity: None,
            max_humidity: None,
            min_altitude: None,
            max_altitude: None,
            cycle_days: None,
            cost_per_hectare: None,
            yield_per_hectare: None,
        }
    }

    fn municipality(id: Id, name: &str) -> Municipality {
        Municipality {
            id,
            name: name.to_string(),
            latitude: None,
            longitude: None,
        }
    }

    fn sowing(product_id: Id, municipality_id: Id) -> Sowing {
        Sowing {
            id: 0,
            farmer_id: 1,
            product_id,
            municipality_id,
            quantity: 1.0,
            unit: AreaUnit::Hectare,
            area: 1.0,
            sowing_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: SowingStatus::Ongoing,
            created_at: Utc::now(),
            estimated_harvest_date: None,
            estimated_cost: None,
        }
    }

    fn fixture() -> (Vec<Category>, Vec<Product>, Vec<Municipality>) {
        (
            vec![category(1, "Cereals"), category(2, "Vegetables")],
            vec![
                product(1, 1, "Rice"),
                product(2, 1, "Oats"),
                product(3, 2, "Tomato"),
            ],
            vec![municipality(1, "Pasto"), municipality(2, "Ipiales")],
        )
    }

    #[test]
    fn distribution_counts_and_percents() {
        let (categories, products, municipalities) = fixture();
        let sowings = vec![
            sowing(1, 1),
            sowing(1, 1),
            sowing(2, 1),
            sowing(3, 2),
        ];

        let stats = aggregate(&sowings, &products, &categories, &municipalities, 0.6);

        assert_eq!(stats.total_sowings, 4);
        assert_eq!(stats.by_product[0].name, "Rice");
        assert_eq!(stats.by_product[0].count, 2);
        assert_eq!(stats.by_product[0].percent, 50.0);
        assert_eq!(stats.by_category[0].name, "Cereals");
        assert_eq!(stats.by_category[0].percent, 75.0);
        assert_eq!(stats.by_municipality[0].name, "Pasto");
        assert_eq!(stats.by_municipality[0].count, 3);
    }

    #[test]
    fn alert_fires_at_threshold() {
        let (categories, products, municipalities) = fixture();
        let sowings = vec![sowing(1, 1), sowing(1, 1), sowing(1, 1), sowing(2, 1), sowing(3, 2)];

        let stats = aggregate(&sowings, &products, &categories, &municipalities, 0.6);

        assert_eq!(stats.alerts.len(), 1);
        assert_eq!(stats.alerts[0].kind, "overplanting");
        assert_eq!(stats.alerts[0].message, "Overplanting of Rice (60%)");
    }

    #[test]
    fn no_alert_below_threshold() {
        let (categories, products, municipalities) = fixture();
        let sowings = vec![sowing(1, 1), sowing(2, 1)];

        let stats = aggregate(&sowings, &products, &categories, &municipalities, 0.6);
        assert!(stats.alerts.is_empty());
    }

    #[test]
    fn empty_store_reports_zeros() {
        let (categories, products, municipalities) = fixture();
        let stats = aggregate(&[], &products, &categories, &municipalities, 0.6);

        assert_eq!(stats.total_sowings, 0);
        assert!(stats.by_product.is_empty());
        assert!(stats.alerts.is_empty());
    }

    #[test]
    fn dangling_references_group_as_unknown() {
        let (categories, products, municipalities) = fixture();
        let sowings = vec![sowing(99, 1)];

        let stats = aggregate(&sowings, &products, &categories, &municipalities, 0.6);
        assert_eq!(stats.by_product[0].name, "unknown");
        assert_eq!(stats.by_category[0].name, "unknown");
    }
}
