//! Simulation configuration.
//!
//! Wraps the encounter tuning with clock, run-length and scene settings.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

use bossroom_combat::EncounterConfig;
use bossroom_common::{BossroomError, ConfigError};

use crate::session::SessionConfig;

/// Clock and run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    // === Clock ===
    /// Fixed simulation step in seconds
    pub fixed_dt: f32,
    /// Frame length fed to the clock when not running in real time
    pub frame_dt: f32,
    /// Pace frames against the wall clock
    pub realtime: bool,
    /// Frame rate targeted in real-time mode
    pub target_fps: u32,

    // === Run ===
    /// Hard stop for the run, in simulated seconds
    pub max_seconds: f32,
    /// Drive the player with the scripted autopilot
    pub autopilot: bool,
    /// Capacity of the notification bus
    pub bus_capacity: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            frame_dt: 1.0 / 60.0,
            realtime: false,
            target_fps: 60,
            max_seconds: 180.0,
            autopilot: true,
            bus_capacity: 1024,
        }
    }
}

impl SimulationSettings {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.fixed_dt = self.fixed_dt.clamp(0.001, 0.1);
        self.frame_dt = self.frame_dt.clamp(0.001, 0.25);
        self.target_fps = self.target_fps.clamp(10, 500);
        self.max_seconds = self.max_seconds.clamp(1.0, 3600.0);
        self.bus_capacity = self.bus_capacity.clamp(16, 65_536);
    }
}

/// Everything the runner reads from disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Clock and run settings
    pub simulation: SimulationSettings,
    /// Boss, player and spawn positions
    pub encounter: EncounterConfig,
    /// Scene names and transition timing
    pub session: SessionConfig,
}

impl SimulationConfig {
    /// Load configuration from a path, falling back to defaults.
    ///
    /// A missing file is expected on first run; anything else is logged as a warning.
    #[must_use]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(ConfigError::NotFound(_)) => {
                info!("Config file not found, using defaults");
                Self::default()
            },
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            },
        }
    }

    /// Load configuration from a path, reporting what went wrong.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let mut contents = String::new();
        fs::File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), BossroomError> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp every section to valid ranges.
    pub fn validate(&mut self) {
        self.simulation.validate();
        self.encounter.validate();
        self.session.validate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert!((config.simulation.fixed_dt - 1.0 / 60.0).abs() < 1e-6);
        assert!(config.simulation.autopilot);
        assert_eq!(config.session.next_scene, "NextLevel");
        assert_eq!(config.encounter.boss.health.max_hp, 300);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimulationConfig::default();

        config.simulation.fixed_dt = 0.0;
        config.simulation.max_seconds = -5.0;
        config.session.fade_duration = -1.0;

        config.validate();

        assert!((config.simulation.fixed_dt - 0.001).abs() < 1e-6);
        assert_eq!(config.simulation.max_seconds, 1.0);
        assert_eq!(config.session.fade_duration, 0.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("bossroom.toml");

        let mut config = SimulationConfig::default();
        config.simulation.max_seconds = 42.0;
        config.simulation.autopilot = false;
        config.encounter.boss.melee_damage = 20;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimulationConfig::load_from(&config_path);
        assert_eq!(loaded.simulation.max_seconds, 42.0);
        assert!(!loaded.simulation.autopilot);
        assert_eq!(loaded.encounter.boss.melee_damage, 20);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimulationConfig::load_from("/nonexistent/path/bossroom.toml");
        assert_eq!(config, SimulationConfig::default());

        let err = SimulationConfig::try_load_from("/nonexistent/path/bossroom.toml");
        assert!(matches!(err, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_parse_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "[simulation\nfixed_dt = ").expect("Failed to write");

        let err = SimulationConfig::try_load_from(&config_path);
        assert!(matches!(err, Err(ConfigError::Parse { .. })));

        let config = SimulationConfig::load_from(&config_path);
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[simulation]\nmax_seconds = 30.0\n").expect("Failed to write");

        let config = SimulationConfig::load_from(&config_path);
        assert_eq!(config.simulation.max_seconds, 30.0);
        assert_eq!(config.encounter, EncounterConfig::default());
    }
}
