//! pulsemap-seed - Database seeding from a CSV of geotagged posts
//!
//! Bootstraps the login account, classifies every row through Gemini, assigns
//! wards by point-in-polygon membership, and populates the posts table.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use pulsemap_api::db::{posts, users};
use pulsemap_api::services::gemini::GeminiClient;
use pulsemap_api::services::seeder;
use pulsemap_api::services::wards::WardIndex;
use pulsemap_common::config;
use pulsemap_common::db::get_setting_i64;

#[derive(Debug, Parser)]
#[command(name = "pulsemap-seed", about = "Seed the PulseMap database from a CSV of geotagged posts")]
struct Args {
    /// CSV file with text, latitude, longitude, city, timestamp columns
    #[arg(long, default_value = "mock_data.csv")]
    csv: PathBuf,

    /// Root folder override (database and ward data location)
    #[arg(long)]
    root_folder: Option<String>,

    /// Bootstrap account username
    #[arg(long, default_value = "admin")]
    username: String,

    /// Bootstrap account password
    #[arg(long, default_value = "password")]
    password: String,

    /// Delete existing posts before seeding
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting PulseMap seeder v{}", env!("CARGO_PKG_VERSION"));

    let toml_config = match config::load_toml_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Failed to load TOML config, using defaults: {}", e);
            config::TomlConfig::default()
        }
    };

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let pool = pulsemap_common::db::init_database(&db_path).await?;

    if args.reset {
        let removed = posts::clear_posts(&pool).await?;
        info!("Reset: removed {} existing posts", removed);
    }

    let user = users::upsert_user(&pool, &args.username, &args.password).await?;
    info!("Bootstrap user '{}' ready", user.username);

    // Read the CSV before touching the network; a missing file aborts cleanly
    let records = seeder::read_csv(&args.csv)?;
    info!("Found {} records in {}", records.len(), args.csv.display());

    // Ward boundaries are optional at seed time: without them posts keep a
    // NULL ward and only the granular endpoint can still place them later
    let wards_path = config::wards_path(&root_folder, &toml_config);
    let wards = match WardIndex::load(&wards_path) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!("Seeding without ward assignment: {}", e);
            None
        }
    };

    let api_key = pulsemap_api::config::resolve_gemini_api_key(&pool, &toml_config).await?;
    let model = pulsemap_api::config::resolve_gemini_model(&pool).await?;
    let client = GeminiClient::new(api_key, model)?;

    let batch_size = get_setting_i64(&pool, "classify_batch_size", 50).await?.max(1) as usize;

    let summary = seeder::seed_posts(&pool, &client, wards.as_ref(), records, batch_size).await?;

    info!(
        "Seeding complete: {} posts inserted, {} classified, {} failed batches",
        summary.inserted, summary.classified, summary.failed_batches
    );

    Ok(())
}
