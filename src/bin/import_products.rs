// CSV catalog import check
//
// Loads a products CSV into a fresh store, reporting per-row outcomes.
// Useful as a dry run before pointing SEED_DIR at a new file.
//
// Usage: cargo run --bin import_products -- <products.csv>

use std::path::PathBuf;
use std::process::ExitCode;

use agroplan::seed;
use agroplan::store::Store;

fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: import_products <products.csv>");
        return ExitCode::FAILURE;
    };

    let store = Store::new();
    let report = match seed::load_products(&store, &path) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("import failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", "=".repeat(60));
    println!("Catalog import: {}", path.display());
    println!("{}", "=".repeat(60));
    println!("  created: {}", report.created);
    println!("  updated: {}", report.updated);
    println!("  skipped: {}", report.skipped.len());
    for message in &report.skipped {
        println!("    - {}", message);
    }

    for category in store.list_categories() {
        let products = store.list_products(Some(category.id), None);
        println!("{} ({} products)", category.name, products.len());
        for product in products {
            let scored = if product.tolerance().is_some() {
                "ok"
            } else {
                "no tolerance ranges"
            };
            println!("  - {} [{}]", product.name, scored);
        }
    }

    if report.skipped.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
