use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};
use crate::importer::IngestOptions;
use crate::reconciler::{MatchOptions, DEFAULT_DATE_TOLERANCE_DAYS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// `null` disables the date window.
    #[serde(default = "default_date_tolerance")]
    pub date_tolerance_days: Option<u32>,
    #[serde(default = "default_header_scan_rows")]
    pub header_scan_rows: usize,
    #[serde(default)]
    pub permissive_header: bool,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

fn default_date_tolerance() -> Option<u32> {
    Some(DEFAULT_DATE_TOLERANCE_DAYS)
}

fn default_header_scan_rows() -> usize {
    IngestOptions::default().scan_rows
}

fn default_export_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("bankrec")
        .to_string_lossy()
        .to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_tolerance_days: default_date_tolerance(),
            header_scan_rows: default_header_scan_rows(),
            permissive_header: false,
            export_dir: default_export_dir(),
        }
    }
}

impl Settings {
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            scan_rows: self.header_scan_rows,
            permissive_header: self.permissive_header,
        }
    }

    pub fn match_options(&self) -> Result<MatchOptions> {
        MatchOptions::new(self.date_tolerance_days)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("bankrec")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "ignoring invalid settings: {e}");
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    settings.match_options()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ReconError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            date_tolerance_days: Some(10),
            header_scan_rows: 30,
            permissive_header: true,
            export_dir: "/tmp/recon".to_string(),
        };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(s.date_tolerance_days, Some(5));
        assert_eq!(s.header_scan_rows, 50);
        assert!(!s.permissive_header);
        assert!(!s.export_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"header_scan_rows": 40}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.header_scan_rows, 40);
        assert_eq!(s.date_tolerance_days, Some(5));
    }

    #[test]
    fn test_null_tolerance_disables_window() {
        let s: Settings = serde_json::from_str(r#"{"date_tolerance_days": null}"#).unwrap();
        assert_eq!(s.match_options().unwrap().date_tolerance_days, None);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_save_rejects_out_of_range_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("settings.json");
        let settings = Settings {
            date_tolerance_days: Some(90),
            ..Settings::default()
        };
        assert!(matches!(
            save_settings_to(&path, &settings),
            Err(ReconError::InvalidTolerance(90))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&path, &Settings::default()).unwrap();
        assert!(path.exists());
    }
}
