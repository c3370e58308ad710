//! Calibration Graphics Adapter
//!
//! During interactive calibration the tracker drives the drawing: it decides
//! where fixation targets appear and when the screen clears, and calls back
//! into application code to render them. [`CalibrationRenderer`] is that
//! callback capability, and [`CalibrationGraphics`] is the adapter that
//! implements it on top of a [`DisplaySurface`], which it exclusively owns.
//!
//! The adapter also hosts the session-facing screen helpers (clear, operator
//! messages) so every pixel that reaches the surface goes through one place.

use tracing::debug;

use crate::display::{Color, DisplaySurface, Result};

/// Shape drawn for a calibration fixation target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetStyle {
    /// Filled circle
    #[default]
    Circle,
    /// Crosshair
    Crosshair,
}

/// Renderer capability the tracker invokes during calibration
///
/// Installed by the session and called by the device link while the
/// interactive setup routine runs.
pub trait CalibrationRenderer {
    /// Set foreground (target) and background colors
    fn set_calibration_colors(&mut self, foreground: Color, background: Color);

    /// Current foreground color
    fn foreground_color(&self) -> Color;

    /// Current background color
    fn background_color(&self) -> Color;

    /// Set target shape and size in pixels
    fn set_target_style(&mut self, style: TargetStyle, size_px: u32);

    /// Prepare the display for calibration (clear to background)
    fn setup_cal_display(&mut self) -> Result<()>;

    /// Draw a fixation target at pixel coordinates
    fn draw_cal_target(&mut self, x: u32, y: u32) -> Result<()>;

    /// Erase the current fixation target
    fn erase_cal_target(&mut self) -> Result<()>;

    /// Leave calibration mode (clear to background)
    fn exit_cal_display(&mut self) -> Result<()>;
}

/// Calibration graphics environment bound to a display surface
///
/// Owns the surface for the lifetime of the session; the session releases
/// both together in teardown.
pub struct CalibrationGraphics {
    surface: Box<dyn DisplaySurface>,
    foreground: Color,
    background: Color,
    target_style: TargetStyle,
    target_size: u32,
}

impl CalibrationGraphics {
    /// Wrap a freshly opened surface
    pub fn new(surface: Box<dyn DisplaySurface>, foreground: Color, background: Color) -> Self {
        Self {
            surface,
            foreground,
            background,
            target_style: TargetStyle::Circle,
            target_size: 24,
        }
    }

    /// Actual pixel dimensions of the owned surface
    pub fn size(&self) -> (u32, u32) {
        self.surface.size()
    }

    /// Bring the surface window to the foreground
    pub fn activate(&mut self) -> Result<()> {
        self.surface.activate()
    }

    /// Clear the surface to the calibration background color
    pub fn clear(&mut self) -> Result<()> {
        self.surface.set_fill_color(self.background);
        self.surface.flip()
    }

    /// Show an operator instruction message
    ///
    /// Clears the screen, draws the message in the foreground color, and
    /// optionally blocks until a key is pressed, clearing again afterwards.
    pub fn show_message(&mut self, text: &str, wait_for_keypress: bool) -> Result<()> {
        self.clear()?;
        self.surface.draw_message(text, self.foreground)?;
        self.surface.flip()?;
        if wait_for_keypress {
            self.surface.wait_for_keypress()?;
            self.clear()?;
        }
        Ok(())
    }

    /// Release the surface
    ///
    /// Flushes the pending frame, then closes. Runs inside teardown, so
    /// failures are logged and swallowed.
    pub fn close(&mut self) {
        if let Err(e) = self.surface.flip() {
            debug!("Surface flush during close failed: {}", e);
        }
        if let Err(e) = self.surface.close() {
            debug!("Surface close failed: {}", e);
        }
    }
}

impl CalibrationRenderer for CalibrationGraphics {
    fn set_calibration_colors(&mut self, foreground: Color, background: Color) {
        self.foreground = foreground;
        self.background = background;
    }

    fn foreground_color(&self) -> Color {
        self.foreground
    }

    fn background_color(&self) -> Color {
        self.background
    }

    fn set_target_style(&mut self, style: TargetStyle, size_px: u32) {
        self.target_style = style;
        self.target_size = size_px;
    }

    fn setup_cal_display(&mut self) -> Result<()> {
        debug!("Entering calibration display");
        self.clear()
    }

    fn draw_cal_target(&mut self, x: u32, y: u32) -> Result<()> {
        let radius = self.target_size / 2;
        match self.target_style {
            TargetStyle::Circle => self.surface.draw_circle(x, y, radius, self.foreground)?,
            TargetStyle::Crosshair => {
                // Rendered as a minimal dot; dedicated backends may draw
                // proper crosshair geometry.
                self.surface.draw_circle(x, y, 2, self.foreground)?;
            }
        }
        self.surface.flip()
    }

    fn erase_cal_target(&mut self) -> Result<()> {
        self.clear()
    }

    fn exit_cal_display(&mut self) -> Result<()> {
        debug!("Leaving calibration display");
        self.clear()
    }
}
