//! Filtered post listing and the ward name list

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::db::posts::{self, PostFilters};
use crate::error::ApiResult;
use crate::AppState;
use pulsemap_common::db::models::Post;

/// Query parameters for the analytics endpoints
///
/// A missing parameter or the literal `All` disables that filter.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub emotion: Option<String>,
    pub city: Option<String>,
    pub ward: Option<String>,
    #[serde(rename = "searchTerm")]
    pub search_term: Option<String>,
}

impl From<AnalyticsQuery> for PostFilters {
    fn from(query: AnalyticsQuery) -> Self {
        PostFilters {
            emotion: query.emotion,
            city: query.city,
            ward: query.ward,
            search_term: query.search_term,
        }
    }
}

/// GET /api/v1/analytics
///
/// Posts matching the given filters, with drivers as JSON arrays.
pub async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let posts = posts::query_posts(&state.db, &query.into(), None).await?;
    Ok(Json(posts))
}

/// GET /api/v1/wards
///
/// Sorted distinct ward names present in the posts table.
pub async fn list_wards(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let wards = posts::distinct_wards(&state.db).await?;
    Ok(Json(wards))
}
