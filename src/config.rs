//! Startup configuration
//!
//! Everything the tool needs before the input subsystem comes up lives in
//! one TOML file, loaded once in `main` and handed down explicitly. A missing
//! file is replaced by the defaults, which are also written to disk so the
//! tester has something to edit.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, Level};

const CONFIG_DIR: &str = "controllertest";
const CONFIG_FILE: &str = "config.toml";

/// Overrides the config file location when set
pub const CONFIG_ENV: &str = "CONTROLLERTEST_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Frame rate must be between 1 and 240, got {0}")]
    InvalidFps(u32),

    #[error("Could not determine a configuration directory")]
    NoConfigDir,
}

/// How a freshly opened controller enters the registry
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachPolicy {
    /// Wait in the pending queue until a remap event confirms the device
    #[default]
    Deferred,
    /// Register on attach and query rumble right away
    Immediate,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// One controller at a time, cycled with the arrow keys
    #[default]
    Single,
    All,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// SDL controller mapping database; relative paths resolve against the
    /// working directory
    pub mapping_database: PathBuf,
    pub attach_policy: AttachPolicy,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mapping_database: PathBuf::from("gamecontrollerdb.txt"),
            attach_policy: AttachPolicy::Deferred,
        }
    }
}

impl InputConfig {
    pub fn mapping_database_path(&self) -> PathBuf {
        if self.mapping_database.is_absolute() {
            self.mapping_database.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&self.mapping_database))
                .unwrap_or_else(|_| self.mapping_database.clone())
        }
    }
}

/// Rumble test parameters, magnitudes in 0.0..=1.0
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RumbleConfig {
    pub low_frequency: f32,
    pub high_frequency: f32,
    pub duration_ms: u64,
}

impl Default for RumbleConfig {
    fn default() -> Self {
        Self {
            low_frequency: 0.7,
            high_frequency: 0.7,
            duration_ms: 500,
        }
    }
}

impl RumbleConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Magnitude scaled to the u16 range force feedback APIs expect
    pub fn magnitude(value: f32) -> u16 {
        (value.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub fps: u32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub mode: DisplayMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 500.0,
            height: 500.0,
            font_size: 14.0,
            mode: DisplayMode::Single,
        }
    }
}

impl DisplayConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file, truncated on start. Empty logs to stderr instead.
    pub file: PathBuf,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("controllertest.log"),
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(self.level.trim())
            .map_err(|_| ConfigError::InvalidLogLevel(self.level.clone()))
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub rumble: RumbleConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Config file location: `$CONTROLLERTEST_CONFIG`, else the platform
    /// config directory
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Loads the config at `path`, writing the defaults there first if the
    /// file does not exist yet
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = AppConfig::default();
            config.save(path)?;
            return Ok(config);
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote configuration to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.level()?;
        if self.display.fps == 0 || self.display.fps > 240 {
            return Err(ConfigError::InvalidFps(self.display.fps));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = AppConfig::load_or_create(&path).unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "[input]\nattach_policy = \"immediate\"\n\n[display]\nmode = \"all\"\nfps = 60\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.input.attach_policy, AttachPolicy::Immediate);
        assert_eq!(
            config.input.mapping_database,
            PathBuf::from("gamecontrollerdb.txt")
        );
        assert_eq!(config.display.mode, DisplayMode::All);
        assert_eq!(config.display.fps, 60);
        assert_eq!(config.display.width, 500.0);
        assert_eq!(config.rumble, RumbleConfig::default());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(level) if level == "loud"));
    }

    #[test]
    fn rejects_zero_fps() {
        let mut config = AppConfig::default();
        config.display.fps = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFps(0))));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[input\n").unwrap();

        match AppConfig::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn rumble_magnitude_clamps() {
        assert_eq!(RumbleConfig::magnitude(0.0), 0);
        assert_eq!(RumbleConfig::magnitude(1.0), u16::MAX);
        assert_eq!(RumbleConfig::magnitude(3.0), u16::MAX);
        assert_eq!(RumbleConfig::magnitude(-1.0), 0);
    }

    #[test]
    fn relative_mapping_database_resolves_against_cwd() {
        let config = InputConfig::default();
        let resolved = config.mapping_database_path();
        assert!(resolved.ends_with("gamecontrollerdb.txt"));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn frame_interval_matches_fps() {
        let display = DisplayConfig::default();
        let interval = display.frame_interval();
        assert!(interval > Duration::from_millis(33) && interval < Duration::from_millis(34));
    }
}
