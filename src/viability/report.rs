//! Viability Report Types
//!
//! Output structures for the viability engine: the normalized score, the
//! qualitative level, the per-factor reasons and the ranked alternatives.

use serde::{Deserialize, Serialize};

use crate::models::Id;

/// Three-tier qualitative suitability level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViabilityLevel {
    High,
    Medium,
    Low,
}

impl ViabilityLevel {
    /// Bucket a normalized score into a level.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            ViabilityLevel::High
        } else if score >= 0.45 {
            ViabilityLevel::Medium
        } else {
            ViabilityLevel::Low
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            ViabilityLevel::High => "High",
            ViabilityLevel::Medium => "Medium",
            ViabilityLevel::Low => "Low",
        }
    }
}

/// A better-suited crop for the same conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub product_id: Id,
    pub name: String,
    pub score: f64,
}

/// Complete result of a viability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityReport {
    pub product_id: Id,
    pub product_name: String,

    /// Normalized suitability score in `[0, 1]`, rounded to 2 decimals.
    pub score: f64,

    pub level: ViabilityLevel,

    /// Human-readable reasons: one line per factor, plus a saturation note
    /// when the local share of this crop is already high.
    pub reasons: Vec<String>,

    /// Top-ranked alternatives, populated only when the level is `Low`.
    pub alternatives: Vec<Alternative>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_thresholds() {
        assert_eq!(ViabilityLevel::from_score(1.0), ViabilityLevel::High);
        assert_eq!(ViabilityLevel::from_score(0.75), ViabilityLevel::High);
        assert_eq!(ViabilityLevel::from_score(0.74), ViabilityLevel::Medium);
        assert_eq!(ViabilityLevel::from_score(0.45), ViabilityLevel::Medium);
        assert_eq!(ViabilityLevel::from_score(0.44), ViabilityLevel::Low);
        assert_eq!(ViabilityLevel::from_score(0.0), ViabilityLevel::Low);
    }

    #[test]
    fn level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ViabilityLevel::High).unwrap(),
            "\"high\""
        );
    }
}
