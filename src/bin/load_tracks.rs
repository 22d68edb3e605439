use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use tracing::{error, info, warn};

use tracker::{config::Settings, loader, store};

/// One-shot bulk import of spreadsheet track records into the store.
#[derive(Parser)]
#[command(name = "load_tracks")]
struct Cli {
    /// Path to the .xlsx file with columns
    /// id, longitude, latitude, speed, gps_time, vehicle_id
    file_path: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded .env file"),
        Err(_) => warn!("Failed to load .env file"),
    };

    let cli = Cli::parse();

    let Some(settings) = Settings::from_env() else {
        error!("DATABASE_URL not in environment");
        exit(1);
    };

    let pool = match store::connect(&settings.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(message = "Failed to connect to database", error=%e);
            exit(1);
        }
    };

    match loader::load_file(&pool, &cli.file_path).await {
        Ok(rows) => info!(message = "done", rows),
        Err(e) => {
            error!(message = "Load aborted, nothing persisted", error=%e);
            exit(1);
        }
    }
}
