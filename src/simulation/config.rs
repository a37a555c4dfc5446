use crate::experiment::SetupOptions;
use crate::scene::host::HostConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lab-wide settings, persisted as RON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Experiment selected at startup
    pub startup_experiment: String,

    /// Simulated seconds per wall-clock second
    pub speed_multiplier: f64,

    /// Cap on trail points; `None` keeps them all
    pub trail_capacity: Option<usize>,

    /// Record per-frame readouts for export
    pub record_data: bool,

    pub host: HostConfig,

    /// Wall-clock step of the headless demo loop, seconds
    pub demo_frame_interval: f64,

    /// The demo stops after this much wall-clock time even if the
    /// experiment never auto-stops
    pub demo_max_seconds: f64,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            startup_experiment: "projectile".to_string(),
            speed_multiplier: 1.0,
            trail_capacity: None,
            record_data: true,
            host: HostConfig::default(),
            demo_frame_interval: 1.0 / 60.0,
            demo_max_seconds: 10.0,
        }
    }
}

impl LabConfig {
    pub fn setup_options(&self) -> SetupOptions {
        SetupOptions {
            trail_capacity: self.trail_capacity,
        }
    }

    /// Save as pretty RON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigSaveError> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, contents)?;
        log::info!("Saved lab config to {:?}", path);
        Ok(())
    }

    /// Load from `path`, falling back to the embedded default when the file
    /// is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match Self::load_from_file(path) {
                Ok(config) => {
                    log::info!("Loaded lab config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to load lab config: {}. Using embedded default.", e);
                }
            }
        } else {
            log::info!("No lab config at {:?}, using embedded default", path);
        }

        Self::load_embedded_default()
    }

    pub fn load_embedded_default() -> Self {
        let embedded = include_str!("../../default_lab_config.ron");
        match ron::from_str::<LabConfig>(embedded) {
            Ok(config) => config,
            Err(e) => {
                log::error!(
                    "Failed to parse embedded default lab config: {}. Using hardcoded default.",
                    e
                );
                Self::default()
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&contents)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigSaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON serialization error: {0}")]
    Ron(#[from] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("virtual-lab-{}-{}.ron", name, std::process::id()))
    }

    #[test]
    fn embedded_default_parses() {
        let embedded = include_str!("../../default_lab_config.ron");
        let config: LabConfig = ron::from_str(embedded).unwrap();
        assert_eq!(config.startup_experiment, "projectile");
        assert_eq!(config.host.surface_size.width, 960);
        assert_eq!(config, LabConfig::load_embedded_default());
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let path = temp_path("roundtrip");
        let mut config = LabConfig::default();
        config.startup_experiment = "circuit".into();
        config.trail_capacity = Some(250);
        config.speed_multiplier = 2.0;
        config.save(&path).unwrap();

        let loaded = LabConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial");
        std::fs::write(&path, "(speed_multiplier: 0.5)").unwrap();
        let loaded = LabConfig::load_from_file(&path);
        let _ = std::fs::remove_file(&path);

        let loaded = loaded.unwrap();
        assert_eq!(loaded.speed_multiplier, 0.5);
        assert_eq!(loaded.startup_experiment, "projectile");
        assert_eq!(loaded.trail_capacity, None);
    }

    #[test]
    fn broken_file_falls_back_to_embedded_default() {
        let path = temp_path("broken");
        std::fs::write(&path, "(speed_multiplier: \"fast\"").unwrap();
        assert!(matches!(
            LabConfig::load_from_file(&path),
            Err(ConfigLoadError::Ron(_))
        ));
        let loaded = LabConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, LabConfig::load_embedded_default());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = temp_path("missing");
        assert!(matches!(
            LabConfig::load_from_file(&path),
            Err(ConfigLoadError::Io(_))
        ));
    }
}
