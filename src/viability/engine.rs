//! Viability Evaluation
//!
//! Scores a product against observed conditions: averages the three
//! range scores, applies the local-saturation penalty, buckets the result
//! into a level and, for poorly-suited crops, ranks alternatives from the
//! rest of the catalog.

use std::cmp::Ordering;

use crate::models::{Product, Sowing};

use super::conditions::Conditions;
use super::range::{range_score, IdealRange, RangeFit, Tolerance};
use super::report::{Alternative, ViabilityLevel, ViabilityReport};

/// Share of local sowings above which the saturation penalty kicks in.
const SATURATION_SHARE: f64 = 0.6;

/// Penalty subtracted from the averaged score for saturated crops.
const SATURATION_PENALTY: f64 = 0.2;

/// Number of alternatives suggested for a `Low` result.
const MAX_ALTERNATIVES: usize = 3;

/// Evaluate a product against observed conditions.
///
/// `municipality_sowings` must already be filtered to the target
/// municipality; it drives the saturation penalty. `catalog` is the full
/// product list used to rank alternatives (the evaluated product and
/// products without tolerance ranges are skipped).
pub fn evaluate(
    product: &Product,
    conditions: &Conditions,
    municipality_sowings: &[Sowing],
    catalog: &[Product],
) -> ViabilityReport {
    let Some(tolerance) = product.tolerance() else {
        return ViabilityReport {
            product_id: product.id,
            product_name: product.name.clone(),
            score: 0.5,
            level: ViabilityLevel::Medium,
            reasons: vec!["Crop has no tolerance parameters defined".to_string()],
            alternatives: Vec::new(),
        };
    };

    let mut reasons = Vec::new();

    // Local saturation: penalize when this crop already dominates the
    // municipality's recorded sowings.
    let total = municipality_sowings.len().max(1);
    let of_product = municipality_sowings
        .iter()
        .filter(|s| s.product_id == product.id)
        .count();
    let share = of_product as f64 / total as f64;
    let saturation_penalty = if share >= SATURATION_SHARE {
        reasons.push(format!(
            "Local saturation of {}: {}%",
            product.name,
            round1(share * 100.0)
        ));
        SATURATION_PENALTY
    } else {
        0.0
    };

    let raw = average_fit(&tolerance, conditions);
    let score = (raw - saturation_penalty).max(0.0);
    let level = ViabilityLevel::from_score(score);

    reasons.push(factor_reason(
        "Temperature",
        conditions.temperature_c,
        &tolerance.temp,
    ));
    reasons.push(factor_reason(
        "Rainfall",
        conditions.rainfall_mm,
        &tolerance.rain,
    ));
    reasons.push(factor_reason(
        "Humidity",
        conditions.humidity_pct,
        &tolerance.humidity,
    ));

    let alternatives = if level == ViabilityLevel::Low {
        rank_alternatives(product.id, conditions, catalog)
    } else {
        Vec::new()
    };

    ViabilityReport {
        product_id: product.id,
        product_name: product.name.clone(),
        score: round2(score),
        level,
        reasons,
        alternatives,
    }
}

/// Average of the three per-factor range scores.
fn average_fit(tolerance: &Tolerance, conditions: &Conditions) -> f64 {
    (range_score(conditions.temperature_c, &tolerance.temp)
        + range_score(conditions.rainfall_mm, &tolerance.rain)
        + range_score(conditions.humidity_pct, &tolerance.humidity))
        / 3.0
}

/// Rank the other catalog products by fit for the same conditions.
fn rank_alternatives(
    exclude_id: u64,
    conditions: &Conditions,
    catalog: &[Product],
) -> Vec<Alternative> {
    let mut ranked: Vec<Alternative> = catalog
        .iter()
        .filter(|p| p.id != exclude_id)
        .filter_map(|p| {
            let tolerance = p.tolerance()?;
            Some(Alternative {
                product_id: p.id,
                name: p.name.clone(),
                score: round2(average_fit(&tolerance, conditions)),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(MAX_ALTERNATIVES);
    ranked
}

/// One reason line per factor, stating where the observed value sits.
fn factor_reason(label: &str, value: f64, range: &IdealRange) -> String {
    match RangeFit::classify(value, range) {
        RangeFit::Below => format!("{} below the ideal range ({} < {})", label, value, range.min),
        RangeFit::Above => format!("{} above the ideal range ({} > {})", label, value, range.max),
        RangeFit::Within => format!(
            "{} within the ideal range ({}-{})",
            label, range.min, range.max
        ),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, Utc};

    use crate::models::{AreaUnit, SowingStatus};
    use crate::viability::conditions::Conditions;

    fn product(id: u64, name: &str, temp: (f64, f64), rain: (f64, f64), hum: (f64, f64)) -> Product {
        Product {
            id,
            category_id: 1,
            name: name.to_string(),
            min_temp: Some(temp.0),
            max_temp: Some(temp.1),
            min_rain: Some(rain.0),
            max_rain: Some(rain.1),
            min_humidity: Some(hum.0),
            max_humidity: Some(hum.1),
            min_altitude: None,
            max_altitude: None,
            cycle_days: None,
            cost_per_hectare: None,
            yield_per_hectare: None,
        }
    }

    fn bare_product(id: u64, name: &str) -> Product {
        Product {
            id,
            category_id: 1,
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

    fn sowing(product_id: u64) -> Sowing {
        Sowing {
            id: 0,
            farmer_id: 1,
            product_id,
            municipality_id: 1,
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

    fn tomato() -> Product {
        product(1, "Tomato", (18.0, 28.0), (1.0, 8.0), (40.0, 70.0))
    }

    #[test]
    fn ideal_conditions_score_high() {
        let conditions = Conditions {
            temperature_c: 22.0,
            rainfall_mm: 4.0,
            humidity_pct: 55.0,
        };
        let report = evaluate(&tomato(), &conditions, &[], &[]);

        assert_relative_eq!(report.score, 1.0);
        assert_eq!(report.level, ViabilityLevel::High);
        assert!(report.alternatives.is_empty());
        assert_eq!(report.reasons.len(), 3);
        assert!(report.reasons[0].contains("within the ideal range"));
    }

    #[test]
    fn saturation_penalty_applies_at_sixty_percent() {
        let conditions = Conditions {
            temperature_c: 22.0,
            rainfall_mm: 4.0,
            humidity_pct: 55.0,
        };
        // 3 of 5 local sowings are tomato: share 0.6 triggers the penalty.
        let sowings = vec![sowing(1), sowing(1), sowing(1), sowing(2), sowing(3)];
        let report = evaluate(&tomato(), &conditions, &sowings, &[]);

        assert_relative_eq!(report.score, 0.8);
        assert!(report.reasons[0].contains("Local saturation of Tomato: 60%"));
    }

    #[test]
    fn below_threshold_share_is_not_penalized() {
        let conditions = Conditions {
            temperature_c: 22.0,
            rainfall_mm: 4.0,
            humidity_pct: 55.0,
        };
        let sowings = vec![sowing(1), sowing(2)];
        let report = evaluate(&tomato(), &conditions, &sowings, &[]);

        assert_relative_eq!(report.score, 1.0);
        assert_eq!(report.reasons.len(), 3);
    }

    #[test]
    fn low_level_ranks_alternatives() {
        // Cold, wet, saturated air: terrible for tomato.
        let conditions = Conditions {
            temperature_c: 8.0,
            rainfall_mm: 15.0,
            humidity_pct: 95.0,
        };
        let catalog = vec![
            tomato(),
            product(2, "Rice", (22.0, 30.0), (5.0, 20.0), (60.0, 90.0)),
            product(3, "Oats", (10.0, 20.0), (1.0, 10.0), (50.0, 80.0)),
            product(4, "Strawberry", (10.0, 22.0), (1.0, 8.0), (60.0, 80.0)),
            product(5, "Lentil", (10.0, 20.0), (1.0, 8.0), (40.0, 70.0)),
            bare_product(6, "Unparameterized"),
        ];
        let report = evaluate(&tomato(), &conditions, &[], &catalog);

        assert_eq!(report.level, ViabilityLevel::Low);
        assert_eq!(report.alternatives.len(), 3);
        // Sorted by score, best first, self and rangeless products excluded.
        assert!(report.alternatives.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(report.alternatives.iter().all(|a| a.product_id != 1));
        assert!(report.alternatives.iter().all(|a| a.product_id != 6));
    }

    #[test]
    fn alternatives_empty_above_low() {
        let conditions = Conditions {
            temperature_c: 17.0, // slightly below range, still Medium overall
            rainfall_mm: 4.0,
            humidity_pct: 55.0,
        };
        let catalog = vec![
            tomato(),
            product(2, "Oats", (10.0, 20.0), (1.0, 10.0), (50.0, 80.0)),
        ];
        let report = evaluate(&tomato(), &conditions, &[], &catalog);

        assert!(report.level != ViabilityLevel::Low);
        assert!(report.alternatives.is_empty());
    }

    #[test]
    fn missing_tolerance_defaults_to_medium() {
        let conditions = Conditions {
            temperature_c: 22.0,
            rainfall_mm: 4.0,
            humidity_pct: 55.0,
        };
        let report = evaluate(&bare_product(9, "Mystery"), &conditions, &[], &[]);

        assert_relative_eq!(report.score, 0.5);
        assert_eq!(report.level, ViabilityLevel::Medium);
        assert_eq!(
            report.reasons,
            vec!["Crop has no tolerance parameters defined".to_string()]
        );
        assert!(report.alternatives.is_empty());
    }

    #[test]
    fn score_never_goes_negative() {
        let conditions = Conditions {
            temperature_c: 200.0,
            rainfall_mm: 500.0,
            humidity_pct: 0.0,
        };
        let sowings = vec![sowing(1), sowing(1), sowing(1)];
        let report = evaluate(&tomato(), &conditions, &sowings, &[]);

        assert_relative_eq!(report.score, 0.0);
        assert_eq!(report.level, ViabilityLevel::Low);
    }

    #[test]
    fn reason_messages_name_the_bound() {
        let conditions = Conditions {
            temperature_c: 12.0,
            rainfall_mm: 10.0,
            humidity_pct: 55.0,
        };
        let report = evaluate(&tomato(), &conditions, &[], &[]);

        assert_eq!(
            report.reasons[0],
            "Temperature below the ideal range (12 < 18)"
        );
        assert_eq!(report.reasons[1], "Rainfall above the ideal range (10 > 8)");
        assert_eq!(
            report.reasons[2],
            "Humidity within the ideal range (40-70)"
        );
    }
}
