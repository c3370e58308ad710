//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::display::Color;

/// Device connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Tracker host address (IP or hostname, optional `:port`);
    /// absent selects the simulated device
    pub host: Option<String>,
}

/// Calibration display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 0-indexed screen the calibration display opens on
    pub screen: i32,

    /// Display resolution (width, height)
    pub resolution: (i32, i32),

    /// Open the display full-screen
    pub fullscreen: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            screen: 0,
            resolution: (1920, 1080),
            fullscreen: true,
        }
    }
}

/// Calibration appearance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Target (foreground) color
    pub foreground: Color,

    /// Display background color
    pub background: Color,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            foreground: Color::MID_GRAY,
            background: Color::BLACK,
        }
    }
}

/// Recording output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the retrieved data files are saved into
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}
