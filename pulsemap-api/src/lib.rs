//! pulsemap-api library interface
//!
//! Exposes the router and application state for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::gemini::GeminiClient;
use crate::services::wards::WardIndex;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Ward boundary registry, loaded once at startup
    pub wards: Arc<WardIndex>,
    /// Gemini classification/summary client
    pub analyst: Arc<GeminiClient>,
}

impl AppState {
    pub fn new(db: SqlitePool, wards: WardIndex, analyst: GeminiClient) -> Self {
        Self {
            db,
            wards: Arc::new(wards),
            analyst: Arc::new(analyst),
        }
    }
}

/// Build application router
///
/// Analytics routes require a valid session cookie; login/status/health are
/// public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require an authenticated session)
    let protected = Router::new()
        .route("/api/v1/wards", get(api::analytics::list_wards))
        .route("/api/v1/analytics", get(api::analytics::analytics))
        .route("/api/v1/analytics/granular", get(api::granular::granular_analytics))
        .route("/api/v1/strategic-summary", get(api::summary::strategic_summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::session_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/v1/login", post(api::auth::login))
        .route("/api/v1/logout", post(api::auth::logout))
        .route("/api/v1/status", get(api::auth::status))
        .merge(api::health::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer for the dashboard frontend
///
/// Configured origins get credentialed CORS (the session cookie must cross
/// origins); with nothing configured the layer is fully permissive.
pub fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    match allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true)
        }
        _ => CorsLayer::permissive(),
    }
}
