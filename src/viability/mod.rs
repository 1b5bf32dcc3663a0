//! Crop Viability Engine
//!
//! Compares observed growing conditions (temperature, rainfall, humidity)
//! against a crop's tolerance ranges and produces a normalized suitability
//! score, a three-tier level, human-readable reasons and a ranked list of
//! better-suited alternatives.
//!
//! The engine is pure and stateless: callers hand it the product, the
//! resolved conditions, the sowings already recorded in the target
//! municipality (for the local-saturation penalty) and the rest of the
//! catalog (for alternatives), and get a report back.
//!
//! ## Architecture
//! - `range.rs` - `IdealRange` + linear distance-penalized range scoring
//! - `conditions.rs` - observed/override condition resolution
//! - `report.rs` - `ViabilityReport` output structs
//! - `engine.rs` - evaluation, saturation penalty, alternatives ranking

pub mod conditions;
pub mod engine;
pub mod range;
pub mod report;

// Re-export public API
pub use conditions::{Conditions, ConditionOverrides};
pub use engine::evaluate;
pub use range::{range_score, IdealRange, RangeFit, Tolerance};
pub use report::{Alternative, ViabilityLevel, ViabilityReport};
