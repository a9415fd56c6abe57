use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::error::RecorderError;

/// The two values remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    pub save_directory: String,
    pub last_device_name: String,
}

impl RecorderSettings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, RecorderError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(RecorderError::Settings(format!("failed to read {}: {}", path.display(), e))),
        };
        serde_json::from_str(&json)
            .map_err(|e| RecorderError::Settings(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), RecorderError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RecorderError::Settings(format!("failed to serialize settings: {}", e)))?;
        fs::write(path, json).map_err(|e| RecorderError::Settings(format!("failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RecorderSettings::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(settings, RecorderSettings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let settings = RecorderSettings {
            save_directory: "/music/takes".into(),
            last_device_name: "Scarlett 18i20".into(),
        };
        settings.save(&path).unwrap();
        assert_eq!(RecorderSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn missing_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"save_directory": "/tmp"}"#).unwrap();
        let settings = RecorderSettings::load(&path).unwrap();
        assert_eq!(settings.save_directory, "/tmp");
        assert_eq!(settings.last_device_name, "");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(RecorderSettings::load(&path), Err(RecorderError::Settings(_))));
    }
}
