// src/settings.rs
//
// Bridge settings, persisted as JSON.
// The debug overlay flag comes from the UI location's query string
// (`?debug=true`); everything else has serde defaults so older or partial
// settings files still load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BridgeError;

const SETTINGS_FILE: &str = "settings.json";
const APP_DIR: &str = "serial-bridge";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BridgeSettings {
    /// UI location announced in the handshake
    #[serde(default = "default_location")]
    pub location: String,
    /// Show the diagnostic log overlay
    #[serde(default)]
    pub debug_view: bool,
    /// Directory for log files. None disables file logging.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_location() -> String {
    "app://serial-bridge/".to_string()
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            location: default_location(),
            debug_view: false,
            log_dir: None,
        }
    }
}

impl BridgeSettings {
    /// Settings for a UI location, with `debug_view` taken from its query.
    pub fn from_location(location: &str) -> Self {
        Self {
            location: location.to_string(),
            debug_view: debug_flag(location),
            log_dir: None,
        }
    }

    /// Point the settings at a new location, re-deriving `debug_view`.
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self.debug_view = debug_flag(location);
        self
    }
}

/// True only when the query carries `debug=true` exactly.
/// Unparseable locations count as no flag.
pub fn debug_flag(location: &str) -> bool {
    let parsed = match url::Url::parse(location) {
        Ok(url) => url,
        Err(_) => return false,
    };
    parsed
        .query_pairs()
        .find(|(key, _)| key == "debug")
        .map(|(_, value)| value == "true")
        .unwrap_or(false)
}

/// Default settings file location under the platform config dir
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Load settings from `path`. On first run (no file) the defaults are
/// written out and returned.
pub fn load_settings(path: &Path) -> Result<BridgeSettings, BridgeError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Io(format!("Failed to read settings: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| BridgeError::Settings(format!("Failed to parse settings: {}", e)))
    } else {
        let settings = BridgeSettings::default();
        save_settings(path, &settings)?;
        Ok(settings)
    }
}

pub fn save_settings(path: &Path, settings: &BridgeSettings) -> Result<(), BridgeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| BridgeError::Io(format!("Failed to create settings dir: {}", e)))?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)
        .map_err(|e| BridgeError::Io(format!("Failed to write settings: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag() {
        assert!(debug_flag("app://serial-bridge/?debug=true"));
        assert!(debug_flag("http://localhost:3000/index.html?x=1&debug=true"));
        assert!(!debug_flag("app://serial-bridge/?debug=false"));
        assert!(!debug_flag("app://serial-bridge/?debug=TRUE"));
        assert!(!debug_flag("app://serial-bridge/?debug"));
        assert!(!debug_flag("app://serial-bridge/"));
        assert!(!debug_flag("not a url"));
    }

    #[test]
    fn test_from_location() {
        let settings = BridgeSettings::from_location("app://ui/?debug=true");
        assert_eq!(settings.location, "app://ui/?debug=true");
        assert!(settings.debug_view);

        let settings = settings.with_location("app://ui/");
        assert!(!settings.debug_view);
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings, BridgeSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = BridgeSettings {
            location: "app://ui/?debug=true".to_string(),
            debug_view: true,
            log_dir: Some(dir.path().join("logs")),
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"debug_view": true}"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert!(settings.debug_view);
        assert_eq!(settings.location, default_location());
        assert!(settings.log_dir.is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(load_settings(&path), Err(BridgeError::Settings(_))));
    }
}
