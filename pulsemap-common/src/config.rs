//! Configuration loading and root folder resolution
//!
//! The root folder holds everything PulseMap persists or reads at runtime:
//! `pulsemap.db` (SQLite) and `wards.geojson` (ward boundary polygons).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "PULSEMAP_ROOT_FOLDER";

/// Optional TOML configuration file contents
///
/// All fields are optional; anything unset falls through to the next
/// resolution tier or a compiled default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for database and ward data
    pub root_folder: Option<String>,
    /// HTTP bind address, e.g. "127.0.0.1:5000"
    pub bind_address: Option<String>,
    /// Ward boundary GeoJSON file (absolute, or relative to root folder)
    pub wards_file: Option<String>,
    /// Gemini API key (lowest-priority source; database and env win)
    pub gemini_api_key: Option<String>,
    /// Exact origins allowed for credentialed CORS; unset = permissive
    pub allowed_origins: Option<Vec<String>>,
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(root_folder) = toml_config.root_folder.as_deref() {
        return PathBuf::from(root_folder);
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Load the TOML config file, returning defaults when none exists
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = match default_config_path() {
        Some(path) if path.exists() => path,
        _ => return Ok(TomlConfig::default()),
    };
    load_toml_config_from(&path)
}

/// Load a TOML config file from an explicit path
pub fn load_toml_config_from(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Default configuration file path for the platform
///
/// `~/.config/pulsemap/config.toml` on Linux, the platform config dir
/// elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pulsemap").join("config.toml"))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pulsemap"))
        .unwrap_or_else(|| PathBuf::from("./pulsemap_data"))
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

/// Database file location within the root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join("pulsemap.db")
}

/// Ward boundary file location
///
/// A configured `wards_file` wins; relative paths are anchored at the root
/// folder. Default is `<root>/wards.geojson`.
pub fn wards_path(root: &Path, toml_config: &TomlConfig) -> PathBuf {
    match toml_config.wards_file.as_deref() {
        Some(configured) => {
            let p = PathBuf::from(configured);
            if p.is_absolute() {
                p
            } else {
                root.join(p)
            }
        }
        None => root.join("wards.geojson"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let toml = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_root_folder(Some("/from/cli"), &toml);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn toml_used_when_no_cli() {
        let toml = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        // Note: assumes PULSEMAP_ROOT_FOLDER is not set in the test env
        if std::env::var(ROOT_FOLDER_ENV).is_ok() {
            return;
        }
        let resolved = resolve_root_folder(None, &toml);
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }

    #[test]
    fn falls_back_to_compiled_default() {
        if std::env::var(ROOT_FOLDER_ENV).is_ok() {
            return;
        }
        let resolved = resolve_root_folder(None, &TomlConfig::default());
        assert_eq!(resolved, default_root_folder());
    }

    #[test]
    fn wards_path_relative_and_absolute() {
        let root = PathBuf::from("/data/pulsemap");

        let relative = TomlConfig {
            wards_file: Some("boundaries/city.geojson".to_string()),
            ..Default::default()
        };
        assert_eq!(
            wards_path(&root, &relative),
            PathBuf::from("/data/pulsemap/boundaries/city.geojson")
        );

        let absolute = TomlConfig {
            wards_file: Some("/srv/gis/city.geojson".to_string()),
            ..Default::default()
        };
        assert_eq!(wards_path(&root, &absolute), PathBuf::from("/srv/gis/city.geojson"));

        assert_eq!(
            wards_path(&root, &TomlConfig::default()),
            PathBuf::from("/data/pulsemap/wards.geojson")
        );
    }

    #[test]
    fn parses_full_toml_config() {
        let content = r#"
            root_folder = "/srv/pulsemap"
            bind_address = "0.0.0.0:5000"
            wards_file = "wards.geojson"
            allowed_origins = ["http://localhost:5173"]
        "#;
        let config: TomlConfig = toml::from_str(content).unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/srv/pulsemap"));
        assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0:5000"));
        assert_eq!(
            config.allowed_origins.as_deref(),
            Some(&["http://localhost:5173".to_string()][..])
        );
        assert!(config.gemini_api_key.is_none());
    }
}
