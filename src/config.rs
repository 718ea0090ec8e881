//! Configuration module
//!
//! Reads/writes settings from ~/.config/imu-logger/config.toml

use crate::acquisition::AcquisitionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Directory name used for logs when `data_dir` is not set.
pub const DATA_DIR_NAME: &str = "IMU_Data";

fn default_bus() -> PathBuf {
    PathBuf::from("/dev/i2c-1")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// I2C character device the IMU sits on
    #[serde(default = "default_bus")]
    pub bus: PathBuf,

    /// Where log files go (defaults to IMU_Data next to the executable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// MCP tools to hide (all others are enabled)
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Acquisitions started by `record` when none is given on the command line
    #[serde(default)]
    pub acquisitions: Vec<AcquisitionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: default_bus(),
            data_dir: None,
            disabled: Vec::new(),
            acquisitions: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("imu-logger").join("config.toml"))
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            tracing::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Save config to file
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Resolve the log directory: the configured one, else `IMU_Data`
    /// beside the running executable, else `IMU_Data` in the working
    /// directory.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join(DATA_DIR_NAME)))
            .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.disabled.is_empty());
        assert!(config.acquisitions.is_empty());
        assert_eq!(config.bus, PathBuf::from("/dev/i2c-1"));
        assert!(config.data_dir().ends_with(DATA_DIR_NAME));
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            bus = "/dev/i2c-3"
            data_dir = "/var/log/imu"
            disabled = ["reset_sensors"]

            [[acquisitions]]
            frequency = 50.0
            file_base_name = "fast"
            rotation_period = 60.0

            [[acquisitions]]
            frequency = 1.0
            file_base_name = "slow"
            "#,
        )
        .unwrap();

        assert_eq!(config.bus, PathBuf::from("/dev/i2c-3"));
        assert_eq!(config.data_dir(), PathBuf::from("/var/log/imu"));
        assert_eq!(config.disabled, ["reset_sensors"]);
        assert_eq!(config.acquisitions.len(), 2);
        assert_eq!(
            config.acquisitions[0],
            AcquisitionConfig::new(50.0, "fast", Some(60.0))
        );
        assert_eq!(config.acquisitions[1].rotation_period, None);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.bus, PathBuf::from("/dev/i2c-1"));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = Config::default();
        config
            .acquisitions
            .push(AcquisitionConfig::new(10.0, "walk", Some(2.0)));
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::parse(&text).unwrap();
        assert_eq!(back.acquisitions, config.acquisitions);
    }
}
