//! CSV ingest pipeline
//!
//! Reads geotagged posts from CSV, classifies them in batches through the
//! Gemini client, assigns wards by point-in-polygon membership, and inserts
//! the rows. A failed classification batch still seeds its rows, marked with
//! the `Error` emotion.

use crate::db::posts;
use crate::services::gemini::{AnalysisInput, GeminiClient, PostAnalysis};
use crate::services::wards::WardIndex;
use pulsemap_common::db::models::{Post, EMOTION_ERROR, EMOTION_UNKNOWN};
use pulsemap_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// One row of the ingest CSV
#[derive(Debug, Clone, Deserialize)]
pub struct CsvRecord {
    pub text: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Outcome counts for one seeding run
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub inserted: usize,
    pub classified: usize,
    pub failed_batches: usize,
}

/// Read ingest records from a CSV file
pub fn read_csv(path: &Path) -> Result<Vec<CsvRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "CSV file not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::InvalidInput(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for (i, result) in reader.deserialize::<CsvRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                // Row numbers are 1-based and exclude the header
                warn!("Skipping malformed CSV row {}: {}", i + 1, e);
            }
        }
    }

    Ok(records)
}

/// Classify, ward-assign and insert the given records
pub async fn seed_posts(
    pool: &SqlitePool,
    client: &GeminiClient,
    wards: Option<&WardIndex>,
    records: Vec<CsvRecord>,
    batch_size: usize,
) -> Result<SeedSummary> {
    let batch_size = batch_size.max(1);
    let mut summary = SeedSummary::default();

    info!("Seeding {} records in batches of {}", records.len(), batch_size);

    for (batch_index, chunk) in records.chunks(batch_size).enumerate() {
        // Ids are only used to map classifier output back to this chunk
        let inputs: Vec<AnalysisInput> = chunk
            .iter()
            .enumerate()
            .map(|(i, record)| AnalysisInput {
                id: i as i64 + 1,
                text: record.text.clone(),
            })
            .collect();

        let analysis = match client.analyze_posts(&inputs).await {
            Ok(map) => Some(map),
            Err(e) => {
                warn!("Classification failed for batch {}: {}", batch_index + 1, e);
                summary.failed_batches += 1;
                None
            }
        };

        for (i, record) in chunk.iter().enumerate() {
            let (emotion, drivers) = resolve_analysis(analysis.as_ref(), i as i64 + 1);
            if analysis.is_some() && emotion != EMOTION_UNKNOWN {
                summary.classified += 1;
            }

            let ward = match (record.latitude, record.longitude) {
                (Some(lat), Some(lon)) => wards
                    .and_then(|index| index.locate(lon, lat))
                    .map(|ward| ward.name.clone()),
                _ => None,
            };

            let post = Post {
                guid: Uuid::new_v4().to_string(),
                text: record.text.clone(),
                latitude: record.latitude,
                longitude: record.longitude,
                city: record.city.clone(),
                ward,
                emotion: Some(emotion),
                drivers,
                posted_at: record.timestamp.clone(),
            };

            posts::insert_post(pool, &post).await?;
            summary.inserted += 1;
        }
    }

    info!(
        inserted = summary.inserted,
        classified = summary.classified,
        failed_batches = summary.failed_batches,
        "Seeding complete"
    );

    Ok(summary)
}

/// Classification fallback rules
///
/// Batch failed outright -> `Error`; batch succeeded but skipped this id ->
/// `Unknown`; both with empty drivers.
fn resolve_analysis(
    batch: Option<&HashMap<i64, PostAnalysis>>,
    id: i64,
) -> (String, Vec<String>) {
    match batch {
        Some(map) => match map.get(&id) {
            Some(analysis) => (analysis.emotion.clone(), analysis.drivers.clone()),
            None => (EMOTION_UNKNOWN.to_string(), Vec::new()),
        },
        None => (EMOTION_ERROR.to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_csv_happy_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "text,latitude,longitude,city,timestamp").unwrap();
        writeln!(file, "Roads are terrible,17.39,78.48,Hyderabad,2025-08-01").unwrap();
        writeln!(file, "No coordinates on this one,,,Hyderabad,").unwrap();
        file.flush().unwrap();

        let records = read_csv(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "Roads are terrible");
        assert_eq!(records[0].latitude, Some(17.39));
        assert_eq!(records[0].city.as_deref(), Some("Hyderabad"));
        assert_eq!(records[1].latitude, None);
        assert_eq!(records[1].timestamp, None);
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = read_csv(Path::new("/nonexistent/mock_data.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mock_data.csv"));
    }

    #[test]
    fn test_resolve_analysis_fallbacks() {
        let mut map = HashMap::new();
        map.insert(
            1,
            PostAnalysis {
                emotion: "Anger".to_string(),
                drivers: vec!["potholes".to_string()],
            },
        );

        let (emotion, drivers) = resolve_analysis(Some(&map), 1);
        assert_eq!(emotion, "Anger");
        assert_eq!(drivers, vec!["potholes".to_string()]);

        // Present batch, missing id
        let (emotion, drivers) = resolve_analysis(Some(&map), 2);
        assert_eq!(emotion, EMOTION_UNKNOWN);
        assert!(drivers.is_empty());

        // Failed batch
        let (emotion, drivers) = resolve_analysis(None, 1);
        assert_eq!(emotion, EMOTION_ERROR);
        assert!(drivers.is_empty());
    }
}
