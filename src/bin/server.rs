// HTTP Server Entry Point
//
// Usage: cargo run --bin server

use agroplan::models::Role;
use agroplan::{create_router, seed, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default log level: info for our crate, warn for others
                "agroplan=info,tower_http=debug,axum=debug,warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting server...");

    let config = Config::from_env();
    tracing::info!("Configuration:");
    tracing::info!("  ADDR: {}", config.addr);
    tracing::info!("  SEED_DIR: {:?}", config.seed_dir);

    let state = AppState::new(&config)?;

    // Optional catalog seeding from CSV files
    if let Some(ref seed_dir) = config.seed_dir {
        let products_csv = seed_dir.join("products.csv");
        if products_csv.exists() {
            let report = seed::load_products(&state.store, &products_csv)?;
            tracing::info!(
                "seeded products: {} created, {} updated, {} skipped",
                report.created,
                report.updated,
                report.skipped.len()
            );
            for message in &report.skipped {
                tracing::warn!("products.csv: {}", message);
            }
        }
        let municipalities_csv = seed_dir.join("municipalities.csv");
        if municipalities_csv.exists() {
            let report = seed::load_municipalities(&state.store, &municipalities_csv)?;
            tracing::info!("seeded municipalities: {} created", report.created);
        }
    }

    // Bootstrap an admin account when requested
    if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
        match state.auth.register("admin", &password, Role::Admin) {
            Ok(user) => tracing::info!("bootstrapped admin `{}`", user.username),
            Err(e) => tracing::warn!("could not bootstrap admin: {}", e),
        }
    }

    let addr = config.addr;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
