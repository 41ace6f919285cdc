//! Google Gemini API client
//!
//! JSON-mode generation for post classification (emotion + drivers) and
//! strategic summaries, with request rate limiting.

use pulsemap_common::db::models::normalize_emotion;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const USER_AGENT: &str = "PulseMap/0.1.0 (https://github.com/pulsemap/pulsemap)";
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

/// One post handed to the classifier
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisInput {
    pub id: i64,
    pub text: String,
}

/// Classification result for one post
#[derive(Debug, Clone, PartialEq)]
pub struct PostAnalysis {
    pub emotion: String,
    pub drivers: Vec<String>,
}

// Wire types for the generateContent RPC

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Batch classification envelope the prompt asks the model to produce
#[derive(Debug, Deserialize)]
struct AnalysisEnvelope {
    analysis: Vec<AnalysisItem>,
}

#[derive(Debug, Deserialize)]
struct AnalysisItem {
    id: i64,
    emotion: String,
    #[serde(default)]
    drivers: Vec<String>,
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    rate_limiter: Arc<RateLimiter>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, GeminiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// Classify a batch of posts for emotion and drivers
    ///
    /// Returns a map from input id to its analysis. Posts the model skipped
    /// are simply absent from the map; callers decide the fallback.
    pub async fn analyze_posts(
        &self,
        records: &[AnalysisInput],
    ) -> Result<HashMap<i64, PostAnalysis>, GeminiError> {
        let prompt = analysis_prompt(records)?;
        let value = self.generate_json(&prompt).await?;

        let envelope: AnalysisEnvelope = serde_json::from_value(value)
            .map_err(|e| GeminiError::ParseError(format!("Unexpected analysis shape: {}", e)))?;

        let mut results = HashMap::with_capacity(envelope.analysis.len());
        for item in envelope.analysis {
            results.insert(
                item.id,
                PostAnalysis {
                    emotion: normalize_emotion(&item.emotion).to_string(),
                    drivers: item.drivers,
                },
            );
        }

        tracing::info!(
            requested = records.len(),
            classified = results.len(),
            "Classified post batch"
        );

        Ok(results)
    }

    /// Generate a strategic summary from aggregated intelligence
    pub async fn strategic_summary(
        &self,
        top_emotion: &str,
        top_drivers: &str,
        news_context: &str,
    ) -> Result<serde_json::Value, GeminiError> {
        let prompt = summary_prompt(top_emotion, top_drivers, news_context);
        self.generate_json(&prompt).await
    }

    /// Run one JSON-mode generateContent call and parse the model's text as JSON
    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value, GeminiError> {
        // Rate limit
        self.rate_limiter.wait().await;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        tracing::debug!(model = %self.model, prompt_bytes = prompt.len(), "Querying Gemini API");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            return Err(GeminiError::ModelNotFound(self.model.clone()));
        }

        if status == 429 {
            return Err(GeminiError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeminiError::ApiError(status.as_u16(), error_text));
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::ParseError(e.to_string()))?;

        let text = first_candidate_text(response).ok_or(GeminiError::EmptyResponse)?;

        serde_json::from_str(&text)
            .map_err(|e| GeminiError::ParseError(format!("Model returned non-JSON text: {}", e)))
    }
}

/// Extract the first candidate's text from a generateContent response
fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
}

/// Batch classification prompt (emotion category + 1-3 driver keywords per post)
fn analysis_prompt(records: &[AnalysisInput]) -> Result<String, GeminiError> {
    let input = serde_json::to_string(records)
        .map_err(|e| GeminiError::ParseError(format!("Failed to serialize records: {}", e)))?;

    Ok(format!(
        r#"You are a sophisticated political analyst. For each text entry in the following list, perform two tasks:
1. Analyze the dominant emotion. Classify it into one of these exact categories: [Hope, Anger, Joy, Anxiety, Sadness, Disgust, Apathy].
2. Identify the root cause. Extract a list of 1 to 3 specific keywords, topics, or proper nouns that are the primary drivers of that emotion.

Return your response as a single, valid JSON object with a single key "analysis" which contains an array. Each object in the array must have an "id", its analyzed "emotion", and a "drivers" list.

Input Data:
{input}

Example Output Format:
{{
    "analysis": [
        {{
            "id": 1,
            "emotion": "Anger",
            "drivers": ["road conditions", "potholes"]
        }},
        {{
            "id": 2,
            "emotion": "Hope",
            "drivers": ["new metro line", "development"]
        }}
    ]
}}"#
    ))
}

/// Strategic briefing prompt built from aggregated filters
fn summary_prompt(top_emotion: &str, top_drivers: &str, news_context: &str) -> String {
    let topics = if top_drivers.is_empty() {
        "General chatter"
    } else {
        top_drivers
    };

    format!(
        r#"You are an expert political strategist for a municipal campaign. Provide a clear, actionable intelligence briefing based on the following.

**Intelligence:**
- Dominant detected emotion: "{top_emotion}"
- Key topics of discussion: "{topics}"
- Live News Context: "{news_context}"

**Your Task:**
Generate a strategic response in JSON format with three keys: "opportunity", "threat", and "prescriptive_action".
Provide only the raw JSON object."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new("test-key".to_string(), "gemini-1.5-flash-latest".to_string());
        assert!(client.is_ok());
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(1000);
        assert_eq!(limiter.min_interval, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(200); // 200ms for faster test

        let start = Instant::now();

        // First request - no wait
        limiter.wait().await;
        let first_elapsed = start.elapsed();

        // Second request - should wait ~200ms
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(150));
    }

    #[test]
    fn test_first_candidate_text_extraction() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"analysis\": []}"}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            first_candidate_text(response).as_deref(),
            Some("{\"analysis\": []}")
        );
    }

    #[test]
    fn test_empty_candidates_yield_none() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(first_candidate_text(response).is_none());
    }

    #[test]
    fn test_analysis_envelope_parsing() {
        let raw = r#"{
            "analysis": [
                {"id": 1, "emotion": "Anger", "drivers": ["potholes"]},
                {"id": 2, "emotion": "hope"},
                {"id": 3, "emotion": "Melancholy", "drivers": ["rain"]}
            ]
        }"#;
        let envelope: AnalysisEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.analysis.len(), 3);
        assert!(envelope.analysis[1].drivers.is_empty());

        // Normalization as applied by analyze_posts
        assert_eq!(normalize_emotion(&envelope.analysis[1].emotion), "Hope");
        assert_eq!(normalize_emotion(&envelope.analysis[2].emotion), "Unknown");
    }

    #[test]
    fn test_analysis_prompt_embeds_records() {
        let records = vec![AnalysisInput {
            id: 7,
            text: "The new flyover finally opened".to_string(),
        }];
        let prompt = analysis_prompt(&records).unwrap();
        assert!(prompt.contains("\"id\":7"));
        assert!(prompt.contains("The new flyover finally opened"));
        assert!(prompt.contains("[Hope, Anger, Joy, Anxiety, Sadness, Disgust, Apathy]"));
    }

    #[test]
    fn test_summary_prompt_fallback_topics() {
        let prompt = summary_prompt("Anger", "", "quiet news day");
        assert!(prompt.contains("General chatter"));
        assert!(prompt.contains("\"Anger\""));
        assert!(prompt.contains("quiet news day"));
    }
}
