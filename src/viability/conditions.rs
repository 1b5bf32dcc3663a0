//! Observed Conditions
//!
//! The three growing factors the engine scores, plus resolution of manual
//! overrides against live weather data. When neither an override nor a
//! weather observation is available for a factor, a neutral default is used
//! so a viability check always has something to score against.

use serde::{Deserialize, Serialize};

use crate::weather::WeatherReport;

/// Observed or assumed conditions for a viability check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub temperature_c: f64,
    pub rainfall_mm: f64,
    pub humidity_pct: f64,
}

/// Neutral fallback conditions used when no weather data is available.
pub const NEUTRAL: Conditions = Conditions {
    temperature_c: 20.0,
    rainfall_mm: 3.0,
    humidity_pct: 70.0,
};

/// Per-factor manual overrides supplied by the caller. Any factor left unset
/// is filled from live weather, then from the neutral defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConditionOverrides {
    pub temperature_c: Option<f64>,
    pub rainfall_mm: Option<f64>,
    pub humidity_pct: Option<f64>,
}

impl ConditionOverrides {
    pub fn is_complete(&self) -> bool {
        self.temperature_c.is_some() && self.rainfall_mm.is_some() && self.humidity_pct.is_some()
    }
}

impl Conditions {
    /// Merge overrides, weather and neutral defaults, in that priority order.
    pub fn resolve(overrides: &ConditionOverrides, weather: Option<&WeatherReport>) -> Self {
        let base = weather.map(Conditions::from_weather).unwrap_or(NEUTRAL);
        Self {
            temperature_c: overrides.temperature_c.unwrap_or(base.temperature_c),
            rainfall_mm: overrides.rainfall_mm.unwrap_or(base.rainfall_mm),
            humidity_pct: overrides.humidity_pct.unwrap_or(base.humidity_pct),
        }
    }

    pub fn from_weather(report: &WeatherReport) -> Self {
        Self {
            temperature_c: report.temperature_c,
            rainfall_mm: report.rainfall_mm,
            humidity_pct: report.humidity_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> WeatherReport {
        WeatherReport {
            temperature_c: 24.0,
            humidity_pct: 55.0,
            rainfall_mm: 1.5,
            description: "clear sky".to_string(),
            wind_speed: 2.0,
        }
    }

    #[test]
    fn overrides_win_over_weather() {
        let overrides = ConditionOverrides {
            temperature_c: Some(30.0),
            rainfall_mm: None,
            humidity_pct: None,
        };
        let conditions = Conditions::resolve(&overrides, Some(&report()));
        assert_eq!(conditions.temperature_c, 30.0);
        assert_eq!(conditions.rainfall_mm, 1.5);
        assert_eq!(conditions.humidity_pct, 55.0);
    }

    #[test]
    fn neutral_defaults_without_weather() {
        let conditions = Conditions::resolve(&ConditionOverrides::default(), None);
        assert_eq!(conditions, NEUTRAL);
    }
}
