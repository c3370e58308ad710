//! Configuration management
//!
//! Handles loading and validation of configuration from:
//! - TOML files
//! - CLI arguments (applied as overrides by the binary)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod types;

pub use types::{CalibrationConfig, DeviceConfig, DisplayConfig, OutputConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device connection configuration
    pub device: DeviceConfig,
    /// Calibration display configuration
    pub display: DisplayConfig,
    /// Calibration appearance configuration
    pub calibration: CalibrationConfig,
    /// Recording output configuration
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gazetrack")
            .join("config.toml")
    }

    /// Apply CLI overrides
    pub fn with_overrides(mut self, host: Option<String>, screen: Option<i32>) -> Self {
        if host.is_some() {
            self.device.host = host;
        }
        if let Some(screen) = screen {
            self.display.screen = screen;
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.display.screen < 0 {
            bail!(
                "display.screen must be a 0-indexed integer, got {}",
                self.display.screen
            );
        }
        let (width, height) = self.display.resolution;
        if width <= 0 || height <= 0 {
            bail!(
                "display.resolution must be two positive integers, got [{}, {}]",
                width,
                height
            );
        }
        if let Some(host) = &self.device.host {
            if host.trim().is_empty() {
                bail!("device.host must not be empty; omit it for the simulated device");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert!(config.device.host.is_none());
        assert_eq!(config.display.resolution, (1920, 1080));
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [device]
            host = "100.1.1.1"

            [display]
            screen = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.device.host.as_deref(), Some("100.1.1.1"));
        assert_eq!(config.display.screen, 1);
        // untouched sections keep their defaults
        assert_eq!(config.output.directory, PathBuf::from("."));
    }

    #[test]
    fn test_colors_parse_as_arrays() {
        let config: Config = toml::from_str(
            r#"
            [calibration]
            foreground = [255, 255, 255]
            background = [32, 32, 32]
            "#,
        )
        .unwrap();
        assert_eq!(<[u8; 3]>::from(config.calibration.foreground), [255, 255, 255]);
        assert_eq!(<[u8; 3]>::from(config.calibration.background), [32, 32, 32]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default_config();
        config.display.screen = -1;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.display.resolution = (0, 1080);
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.device.host = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default_config();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.display.resolution, config.display.resolution);
    }
}
