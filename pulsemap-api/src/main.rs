//! pulsemap-api - Civic sentiment analytics service
//!
//! Serves the dashboard API: session login, filtered post analytics,
//! per-ward spatial aggregation, and Gemini-backed strategic summaries.

use anyhow::Result;
use tracing::{info, warn};

use pulsemap_api::services::gemini::GeminiClient;
use pulsemap_api::services::wards::WardIndex;
use pulsemap_api::{build_router, cors_layer, AppState};
use pulsemap_common::config;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting PulseMap API (pulsemap-api) v{}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration: TOML file, then root folder
    let toml_config = match config::load_toml_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Failed to load TOML config, using defaults: {}", e);
            config::TomlConfig::default()
        }
    };

    let root_folder = config::resolve_root_folder(None, &toml_config);
    config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    // Open or create database
    let pool = pulsemap_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Sweep sessions that expired while the service was down
    let purged = pulsemap_api::db::sessions::purge_expired(&pool).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    // Load ward boundaries once; every granular request reuses this registry
    let wards_path = config::wards_path(&root_folder, &toml_config);
    let wards = WardIndex::load(&wards_path)?;

    // Gemini credentials are required: the strategic summary endpoint cannot
    // run without them (matches the original service's startup contract)
    let api_key = pulsemap_api::config::resolve_gemini_api_key(&pool, &toml_config).await?;
    let model = pulsemap_api::config::resolve_gemini_model(&pool).await?;
    let analyst = GeminiClient::new(api_key, model)?;

    // Create application state and router
    let state = AppState::new(pool, wards, analyst);
    let app = build_router(state).layer(cors_layer(toml_config.allowed_origins.as_deref()));

    let bind_address = toml_config
        .bind_address
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("pulsemap-api listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
