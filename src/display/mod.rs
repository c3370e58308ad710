//! Display Surface Abstraction
//!
//! The session renders calibration targets and operator instructions onto a
//! full-screen surface. Real deployments back this with a windowing stimulus
//! package; dummy-mode runs and tests use the in-memory
//! [`headless::HeadlessSurface`]. The trait captures exactly what the session
//! and the calibration graphics adapter need: size query, fill color, flip,
//! activation, message drawing, keypress wait, and close.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod headless;

pub use headless::HeadlessSurface;

/// Result type for display operations
pub type Result<T> = std::result::Result<T, DisplayError>;

/// Display surface error types
#[derive(Error, Debug)]
pub enum DisplayError {
    /// Opening the rendering surface failed
    #[error("Failed to open display surface: {0}")]
    OpenFailed(String),

    /// Operation on a surface that was already closed
    #[error("Display surface is closed")]
    SurfaceClosed,

    /// Presentation (flip) failed
    #[error("Surface presentation failed: {0}")]
    PresentFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// RGB color, 8 bits per channel
///
/// Serialized in configuration files as a `[r, g, b]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Black, the default calibration background
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    /// Mid-gray, the default calibration foreground
    pub const MID_GRAY: Color = Color {
        r: 128,
        g: 128,
        b: 128,
    };
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Color {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        }
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b]
    }
}

/// Parameters for opening a rendering surface
#[derive(Debug, Clone)]
pub struct SurfaceRequest {
    /// 0-indexed screen to open the surface on
    pub screen: u32,

    /// Requested surface size in pixels (width, height)
    pub resolution: (u32, u32),

    /// Initial fill color
    pub background: Color,

    /// Open full-screen without window decorations
    pub fullscreen: bool,
}

/// Full-screen rendering surface used for calibration graphics
///
/// The session reads back the actual pixel dimensions after opening (the
/// backend may not honor the requested resolution exactly) and transmits
/// them to the tracker so it can map its coordinate space to the display.
pub trait DisplaySurface {
    /// Actual pixel dimensions of the surface (width, height)
    fn size(&self) -> (u32, u32);

    /// Set the fill color applied on the next flip
    fn set_fill_color(&mut self, color: Color);

    /// Present the pending frame
    fn flip(&mut self) -> Result<()>;

    /// Bring the surface window to the foreground and give it input focus
    fn activate(&mut self) -> Result<()>;

    /// Draw a centered text message in the given color
    fn draw_message(&mut self, text: &str, color: Color) -> Result<()>;

    /// Draw a filled circle of the given radius at pixel coordinates
    fn draw_circle(&mut self, x: u32, y: u32, radius: u32, color: Color) -> Result<()>;

    /// Block until the operator presses any key
    fn wait_for_keypress(&mut self) -> Result<()>;

    /// Release the surface; subsequent operations fail with [`DisplayError::SurfaceClosed`]
    fn close(&mut self) -> Result<()>;
}
