use log::{LevelFilter, debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::preview::{PreviewConfig, Zoom};

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagepick";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    #[serde(default = "default_spacing")]
    pub page_padding: f32,

    #[serde(default = "default_spacing")]
    pub fit_margin: f32,

    #[serde(default = "default_overscan")]
    pub overscan: usize,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_zoom_step() -> f32 {
    Zoom::STEP
}

fn default_min_scale() -> f32 {
    Zoom::MIN_SCALE
}

fn default_spacing() -> f32 {
    16.0
}

fn default_overscan() -> usize {
    1
}

fn default_workers() -> usize {
    2
}

fn default_pixel_ratio() -> f32 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zoom_step: default_zoom_step(),
            min_scale: default_min_scale(),
            page_padding: default_spacing(),
            fit_margin: default_spacing(),
            overscan: default_overscan(),
            workers: default_workers(),
            pixel_ratio: default_pixel_ratio(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Preview tunables, with out-of-range values replaced by defaults
    pub fn preview_config(&self) -> PreviewConfig {
        let defaults = PreviewConfig::default();
        let positive = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        PreviewConfig {
            zoom_step: positive(self.zoom_step, defaults.zoom_step),
            min_scale: positive(self.min_scale, defaults.min_scale),
            page_padding: self.page_padding.max(0.0),
            fit_margin: self.fit_margin.max(0.0),
            overscan: self.overscan,
            workers: self.workers.max(1),
            pixel_ratio: positive(self.pixel_ratio, defaults.pixel_ratio),
        }
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            LevelFilter::Info
        })
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `explicit`, or from the user config directory.
///
/// A missing default file is created with defaults; an explicit path that
/// does not exist is reported and ignored.
pub fn load_settings(explicit: Option<&Path>) -> Settings {
    if let Some(path) = explicit {
        return load_settings_from_path(path);
    }

    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };
    if path.exists() {
        load_settings_from_path(&path)
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        settings
    }
}

pub fn load_settings_from_path(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => parse_settings(&content).unwrap_or_else(|e| {
            error!("Failed to parse settings file {path:?}: {e}");
            Settings::default()
        }),
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            Settings::default()
        }
    }
}

fn parse_settings(content: &str) -> Result<Settings, serde_yaml::Error> {
    // An empty file is a document of nulls, not a mapping
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings = serde_yaml::from_str::<Settings>(content)?;
    debug!("Loaded settings: {settings:?}");
    Ok(settings)
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = match serde_yaml::to_string(settings) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_keys_use_defaults() {
        let settings = parse_settings("overscan: 3\nlog_level: debug\n").unwrap();
        assert_eq!(settings.overscan, 3);
        assert_eq!(settings.zoom_step, 0.1);
        assert_eq!(settings.page_padding, 16.0);
        assert_eq!(settings.log_level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn unreadable_yaml_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "zoom_step: [not, a, number]").unwrap();
        assert_eq!(load_settings_from_path(&path), Settings::default());
    }

    #[test]
    fn explicit_path_round_trips_through_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let settings = Settings {
            workers: 4,
            pixel_ratio: 2.0,
            ..Settings::default()
        };
        save_settings_to_file(&settings, &path);
        assert_eq!(load_settings(Some(&path)), settings);
    }

    #[test]
    fn preview_config_rejects_nonsense() {
        let settings = Settings {
            zoom_step: -1.0,
            workers: 0,
            pixel_ratio: f32::NAN,
            ..Settings::default()
        };
        let config = settings.preview_config();
        assert_eq!(config.zoom_step, 0.1);
        assert_eq!(config.workers, 1);
        assert_eq!(config.pixel_ratio, 1.0);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse_settings("  \n").unwrap(), Settings::default());
    }
}
