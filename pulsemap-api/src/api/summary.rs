//! Strategic summary endpoint
//!
//! Aggregates the filtered posts into a briefing prompt and returns the
//! model's JSON response verbatim.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::posts::{self, PostFilters};
use crate::error::{ApiError, ApiResult};
use crate::services::aggregate::{dominant_emotion, top_drivers};
use crate::AppState;
use pulsemap_common::db::{get_setting, get_setting_i64};

const TOP_DRIVER_COUNT: usize = 3;

/// Query parameters for the strategic summary (no ward filter)
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub emotion: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "searchTerm")]
    pub search_term: Option<String>,
}

/// GET /api/v1/strategic-summary
///
/// Too few matching posts yield canned guidance instead of a model call.
pub async fn strategic_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<Value>> {
    let post_cap = get_setting_i64(&state.db, "summary_post_cap", 100).await?;
    let min_posts = get_setting_i64(&state.db, "summary_min_posts", 2).await?;

    let filters = PostFilters {
        emotion: query.emotion,
        city: query.city,
        ward: None,
        search_term: query.search_term,
    };

    let posts = posts::query_posts(&state.db, &filters, Some(post_cap)).await?;

    if (posts.len() as i64) < min_posts {
        return Ok(Json(json!({
            "opportunity": "Not enough data for this filter.",
            "threat": "Please broaden your criteria.",
            "prescriptive_action": "Try selecting 'All' for filters."
        })));
    }

    let top_emotion = dominant_emotion(posts.iter().filter_map(|p| p.emotion.as_deref()))
        .unwrap_or_else(|| "Unknown".to_string());

    let drivers_text = top_drivers(
        posts.iter().flat_map(|p| p.drivers.iter().map(String::as_str)),
        TOP_DRIVER_COUNT,
    )
    .join(", ");

    let news_context = get_setting(&state.db, "summary_news_context")
        .await?
        .unwrap_or_default();

    let summary = state
        .analyst
        .strategic_summary(&top_emotion, &drivers_text, &news_context)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to generate strategic summary: {}", e)))?;

    Ok(Json(summary))
}
