//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emotion categories the classifier may assign
///
/// `Unknown` covers posts the classifier could not map; `Error` marks posts
/// whose classification batch failed outright.
pub const EMOTIONS: [&str; 7] = [
    "Hope", "Anger", "Joy", "Anxiety", "Sadness", "Disgust", "Apathy",
];

/// Emotion value for posts missing from a classifier response
pub const EMOTION_UNKNOWN: &str = "Unknown";

/// Emotion value for posts whose classification batch failed
pub const EMOTION_ERROR: &str = "Error";

/// Normalize a classifier-reported emotion to the stored category set
///
/// Off-list responses become `Unknown` so they can never fail the posts
/// table CHECK constraint.
pub fn normalize_emotion(raw: &str) -> &'static str {
    EMOTIONS
        .iter()
        .find(|e| e.eq_ignore_ascii_case(raw.trim()))
        .copied()
        .unwrap_or(EMOTION_UNKNOWN)
}

/// A geotagged social-media-style post with its classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub guid: String,
    pub text: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub ward: Option<String>,
    pub emotion: Option<String>,
    pub drivers: Vec<String>,
    /// Source timestamp as provided by the ingested data (free-form)
    pub posted_at: Option<String>,
}

/// A login account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub guid: String,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
}

/// An active login session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_guid: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_normalize_emotion_exact_and_case() {
        assert_eq!(normalize_emotion("Anger"), "Anger");
        assert_eq!(normalize_emotion("anger"), "Anger");
        assert_eq!(normalize_emotion("  Hope "), "Hope");
    }

    #[test]
    fn test_normalize_emotion_off_list() {
        assert_eq!(normalize_emotion("Melancholy"), EMOTION_UNKNOWN);
        assert_eq!(normalize_emotion(""), EMOTION_UNKNOWN);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            token: "t".to_string(),
            user_guid: "u".to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(60),
        };
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::seconds(61)));
    }
}
