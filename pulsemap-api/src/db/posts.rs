//! Post storage and filtered queries

use pulsemap_common::db::models::Post;
use pulsemap_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Filter sentinel meaning "do not filter on this column"
pub const FILTER_ALL: &str = "All";

/// Optional filters shared by the analytics and summary endpoints
///
/// A missing value or the literal `All` disables that filter; `search_term`
/// is a substring match on the post text.
#[derive(Debug, Default, Clone)]
pub struct PostFilters {
    pub emotion: Option<String>,
    pub city: Option<String>,
    pub ward: Option<String>,
    pub search_term: Option<String>,
}

impl PostFilters {
    fn active(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .filter(|v| !v.is_empty() && *v != FILTER_ALL)
    }

    fn search(&self) -> Option<&str> {
        self.search_term.as_deref().filter(|v| !v.is_empty())
    }
}

/// A post reduced to what the spatial aggregation needs
#[derive(Debug, Clone)]
pub struct LocatedPost {
    pub latitude: f64,
    pub longitude: f64,
    pub emotion: Option<String>,
    pub drivers: Vec<String>,
}

/// Insert a post row
pub async fn insert_post(pool: &SqlitePool, post: &Post) -> Result<()> {
    let drivers = serde_json::to_string(&post.drivers)
        .map_err(|e| pulsemap_common::Error::Internal(format!("Failed to serialize drivers: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO posts (guid, text, latitude, longitude, city, ward, emotion, drivers, posted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.guid)
    .bind(&post.text)
    .bind(post.latitude)
    .bind(post.longitude)
    .bind(&post.city)
    .bind(&post.ward)
    .bind(&post.emotion)
    .bind(&drivers)
    .bind(&post.posted_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Query posts matching the given filters, newest first
pub async fn query_posts(
    pool: &SqlitePool,
    filters: &PostFilters,
    limit: Option<i64>,
) -> Result<Vec<Post>> {
    let mut sql = String::from(
        "SELECT guid, text, latitude, longitude, city, ward, emotion, drivers, posted_at
         FROM posts WHERE 1=1",
    );
    let mut binds: Vec<String> = Vec::new();

    if let Some(emotion) = PostFilters::active(&filters.emotion) {
        sql.push_str(" AND emotion = ?");
        binds.push(emotion.to_string());
    }
    if let Some(city) = PostFilters::active(&filters.city) {
        sql.push_str(" AND city = ?");
        binds.push(city.to_string());
    }
    if let Some(ward) = PostFilters::active(&filters.ward) {
        sql.push_str(" AND ward = ?");
        binds.push(ward.to_string());
    }
    if let Some(term) = filters.search() {
        sql.push_str(" AND text LIKE ?");
        binds.push(format!("%{}%", term));
    }

    sql.push_str(" ORDER BY created_at DESC, guid");
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ");
        sql.push_str(&limit.to_string());
    }

    let mut query = sqlx::query(&sql);
    for bind in &binds {
        query = query.bind(bind);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_post).collect())
}

/// Sorted distinct non-null ward names present in the posts table
pub async fn distinct_wards(pool: &SqlitePool) -> Result<Vec<String>> {
    let wards: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT ward FROM posts WHERE ward IS NOT NULL ORDER BY ward",
    )
    .fetch_all(pool)
    .await?;

    Ok(wards)
}

/// Fetch every post that carries coordinates, for the spatial join
pub async fn located_posts(pool: &SqlitePool) -> Result<Vec<LocatedPost>> {
    let rows = sqlx::query(
        "SELECT latitude, longitude, emotion, drivers FROM posts
         WHERE latitude IS NOT NULL AND longitude IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| LocatedPost {
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            emotion: row.get("emotion"),
            drivers: parse_drivers(row.get("drivers")),
        })
        .collect())
}

/// Delete all posts (seeder `--reset`)
pub async fn clear_posts(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query("DELETE FROM posts").execute(pool).await?;
    Ok(result.rows_affected() as usize)
}

fn row_to_post(row: &SqliteRow) -> Post {
    Post {
        guid: row.get("guid"),
        text: row.get("text"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        city: row.get("city"),
        ward: row.get("ward"),
        emotion: row.get("emotion"),
        drivers: parse_drivers(row.get("drivers")),
        posted_at: row.get("posted_at"),
    }
}

/// Drivers are stored as a JSON array; unreadable values degrade to empty
fn parse_drivers(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_default()
}
