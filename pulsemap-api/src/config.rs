//! Credential resolution for the Gemini classifier
//!
//! Provides multi-tier configuration resolution with Database → ENV → TOML
//! priority.

use pulsemap_common::config::TomlConfig;
use pulsemap_common::db::get_setting;
use pulsemap_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Environment variable carrying the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "PULSEMAP_GEMINI_API_KEY";

/// Settings table key for the Gemini API key
pub const GEMINI_API_KEY_SETTING: &str = "gemini_api_key";

/// Resolve the Gemini API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_gemini_api_key(db: &SqlitePool, toml_config: &TomlConfig) -> Result<String> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = get_setting(db, GEMINI_API_KEY_SETTING).await?;
    if let Some(key) = &db_key {
        if is_valid_key(key) {
            sources.push("database");
        }
    }

    // Tier 2: Environment variable
    let env_key = std::env::var(GEMINI_API_KEY_ENV).ok();
    if let Some(key) = &env_key {
        if is_valid_key(key) {
            sources.push("environment");
        }
    }

    // Tier 3: TOML config
    let toml_key = toml_config.gemini_api_key.as_ref();
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            sources.push("TOML");
        }
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    // Resolution priority
    if let Some(key) = db_key {
        if is_valid_key(&key) {
            info!("Gemini API key loaded from database");
            return Ok(key);
        }
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("Gemini API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("Gemini API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    // No valid key found
    Err(Error::Config(
        "Gemini API key not configured. Please configure using one of:\n\
         1. Database: settings key 'gemini_api_key'\n\
         2. Environment: PULSEMAP_GEMINI_API_KEY=your-key-here\n\
         3. TOML config: ~/.config/pulsemap/config.toml (gemini_api_key = \"your-key\")\n\
         \n\
         Obtain API key at: https://aistudio.google.com/apikey"
            .to_string(),
    ))
}

/// Resolve the Gemini model name from the settings table
pub async fn resolve_gemini_model(db: &SqlitePool) -> Result<String> {
    Ok(get_setting(db, "gemini_model")
        .await?
        .unwrap_or_else(|| "gemini-1.5-flash-latest".to_string()))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("abc123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
