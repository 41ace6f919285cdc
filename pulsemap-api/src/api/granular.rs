//! Per-ward spatial aggregation
//!
//! Assigns coordinate-bearing posts to wards by point-in-polygon membership
//! and returns one GeoJSON Feature per ward that received posts.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::db::posts;
use crate::error::{ApiError, ApiResult};
use crate::services::aggregate::{dominant_emotion, top_drivers};
use crate::AppState;

const TOP_DRIVER_COUNT: usize = 3;

#[derive(Default)]
struct WardBucket {
    emotions: Vec<String>,
    drivers: Vec<String>,
    post_count: usize,
}

/// GET /api/v1/analytics/granular
///
/// GeoJSON FeatureCollection of wards with their dominant emotion, post
/// count and top drivers. Wards without posts are omitted; posts outside
/// every ward are ignored.
pub async fn granular_analytics(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let located = posts::located_posts(&state.db).await?;

    let mut buckets: HashMap<String, WardBucket> = HashMap::new();
    for post in &located {
        let Some(ward) = state.wards.locate(post.longitude, post.latitude) else {
            continue;
        };

        let bucket = buckets.entry(ward.name.clone()).or_default();
        bucket.post_count += 1;
        if let Some(emotion) = &post.emotion {
            bucket.emotions.push(emotion.clone());
        }
        bucket.drivers.extend(post.drivers.iter().cloned());
    }

    // Emit features in registry order for a stable response
    let mut features = Vec::with_capacity(buckets.len());
    for ward in state.wards.iter() {
        let Some(bucket) = buckets.get(&ward.name) else {
            continue;
        };

        let dominant = dominant_emotion(bucket.emotions.iter().map(String::as_str))
            .unwrap_or_else(|| "N/A".to_string());
        let drivers = top_drivers(bucket.drivers.iter().map(String::as_str), TOP_DRIVER_COUNT);

        let geometry = serde_json::to_value(&ward.geometry)
            .map_err(|e| ApiError::Internal(format!("Failed to serialize ward geometry: {}", e)))?;

        features.push(json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": {
                "ward_name": ward.name,
                "dominant_emotion": dominant,
                "post_count": bucket.post_count,
                "top_drivers": drivers,
            }
        }));
    }

    Ok(Json(json!({
        "type": "FeatureCollection",
        "features": features,
    })))
}
