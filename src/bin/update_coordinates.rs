// Geocoding backfill for municipality seed files
//
// Reads a municipalities CSV, resolves missing coordinates via Nominatim
// and rewrites the file in place.
//
// Usage: cargo run --bin update_coordinates -- <municipalities.csv>

use std::path::PathBuf;
use std::process::ExitCode;

use serde::{Deserialize, Serialize};

use agroplan::weather::WeatherClient;
use agroplan::Config;

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: update_coordinates <municipalities.csv>");
        return ExitCode::FAILURE;
    };

    match run(&path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("update failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &PathBuf) -> anyhow::Result<()> {
    let config = Config::from_env();
    let client = WeatherClient::new(&config)?;

    let mut reader = csv::Reader::from_path(path)?;
    let mut rows: Vec<Row> = Vec::new();
    for row in reader.deserialize::<Row>() {
        rows.push(row?);
    }

    let mut updated = 0;
    for row in &mut rows {
        if row.latitude.is_some() && row.longitude.is_some() {
            continue;
        }
        match client.geocode(&row.name).await? {
            Some(coords) => {
                row.latitude = Some(coords.latitude);
                row.longitude = Some(coords.longitude);
                updated += 1;
                println!("updated coordinates for {}", row.name);
            }
            None => println!("no coordinates found for {}", row.name),
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    println!("{} of {} municipalities updated", updated, rows.len());
    Ok(())
}
