//! CSV Catalog Seeding
//!
//! Loads the crop catalog and municipality list from CSV files into the
//! store. The product loader upserts by (category, name) and creates
//! missing categories on demand; rows without a category are reported and
//! skipped rather than aborting the whole load.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{MunicipalityInput, ProductInput};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("store rejected record: {0}")]
    Store(#[from] StoreError),
}

/// One row of `products.csv`.
#[derive(Debug, Deserialize)]
struct ProductRow {
    category: String,
    name: String,
    min_temp: Option<f64>,
    max_temp: Option<f64>,
    min_rain: Option<f64>,
    max_rain: Option<f64>,
    min_humidity: Option<f64>,
    max_humidity: Option<f64>,
    min_altitude: Option<i32>,
    max_altitude: Option<i32>,
    cycle_days: Option<u32>,
    cost_per_hectare: Option<f64>,
    yield_per_hectare: Option<f64>,
}

/// One row of `municipalities.csv`.
#[derive(Debug, Deserialize)]
struct MunicipalityRow {
    name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Outcome of a catalog load.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    /// Messages for rows that could not be imported.
    pub skipped: Vec<String>,
}

/// Load (upsert) products from a CSV file.
pub fn load_products(store: &Store, path: &Path) -> Result<ImportReport, SeedError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut report = ImportReport::default();

    for (idx, row) in reader.deserialize::<ProductRow>().enumerate() {
        let line = idx + 2; // header is line 1
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.skipped.push(format!("line {}: {}", line, e));
                continue;
            }
        };

        let category_name = row.category.trim();
        if category_name.is_empty() {
            report
                .skipped
                .push(format!("line {}: product `{}` has no category", line, row.name));
            continue;
        }

        let category = match store.find_category_by_name(category_name) {
            Some(category) => category,
            None => {
                let category = store.create_category(category_name)?;
                tracing::info!("created category `{}`", category.name);
                category
            }
        };

        let input = ProductInput {
            category_id: category.id,
            name: row.name.trim().to_string(),
            min_temp: row.min_temp,
            max_temp: row.max_temp,
            min_rain: row.min_rain,
            max_rain: row.max_rain,
            min_humidity: row.min_humidity,
            max_humidity: row.max_humidity,
            min_altitude: row.min_altitude,
            max_altitude: row.max_altitude,
            cycle_days: row.cycle_days,
            cost_per_hectare: row.cost_per_hectare,
            yield_per_hectare: row.yield_per_hectare,
        };

        match store.find_product(category.id, &input.name) {
            Some(existing) => {
                store.update_product(existing.id, &input)?;
                report.updated += 1;
            }
            None => {
                store.create_product(&input)?;
                report.created += 1;
            }
        }
    }

    Ok(report)
}

/// Load municipalities from a CSV file. Duplicates are skipped.
pub fn load_municipalities(store: &Store, path: &Path) -> Result<ImportReport, SeedError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut report = ImportReport::default();

    for (idx, row) in reader.deserialize::<MunicipalityRow>().enumerate() {
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.skipped.push(format!("line {}: {}", line, e));
                continue;
            }
        };

        let input = MunicipalityInput {
            name: row.name.trim().to_string(),
            latitude: row.latitude,
            longitude: row.longitude,
        };
        match store.create_municipality(&input) {
            Ok(_) => report.created += 1,
            Err(StoreError::DuplicateMunicipality(name)) => {
                report
                    .skipped
                    .push(format!("line {}: municipality `{}` already exists", line, name));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}
