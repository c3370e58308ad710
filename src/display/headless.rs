//! In-Memory Display Surface
//!
//! Surface implementation with no windowing backend. Used for dummy-mode
//! sessions and tests: it honors the requested resolution exactly, presents
//! into the void, and returns immediately from keypress waits.

use tracing::debug;

use super::{Color, DisplayError, DisplaySurface, Result, SurfaceRequest};

/// Headless display surface
///
/// Tracks the same state a windowed surface would (size, fill color, open
/// flag) so the session lifecycle behaves identically with and without a
/// physical display attached.
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    fill: Color,
    open: bool,
    flips: u64,
}

impl HeadlessSurface {
    /// Open a headless surface honoring the requested resolution
    pub fn open(request: &SurfaceRequest) -> Result<Self> {
        let (width, height) = request.resolution;
        if width == 0 || height == 0 {
            return Err(DisplayError::OpenFailed(format!(
                "Surface resolution must be non-zero, got {}x{}",
                width, height
            )));
        }
        debug!(
            "Opening headless surface: {}x{} on screen {}",
            width, height, request.screen
        );
        Ok(Self {
            width,
            height,
            fill: request.background,
            open: true,
            flips: 0,
        })
    }

    /// Number of frames presented so far
    pub fn flip_count(&self) -> u64 {
        self.flips
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(DisplayError::SurfaceClosed)
        }
    }
}

impl DisplaySurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_fill_color(&mut self, color: Color) {
        self.fill = color;
    }

    fn flip(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flips += 1;
        debug!("Headless flip #{} (fill {:?})", self.flips, self.fill);
        Ok(())
    }

    fn activate(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn draw_message(&mut self, text: &str, _color: Color) -> Result<()> {
        self.ensure_open()?;
        debug!("Headless message: {}", text.trim());
        Ok(())
    }

    fn draw_circle(&mut self, x: u32, y: u32, radius: u32, _color: Color) -> Result<()> {
        self.ensure_open()?;
        debug!("Headless circle: r={} at ({}, {})", radius, x, y);
        Ok(())
    }

    fn wait_for_keypress(&mut self) -> Result<()> {
        // No operator in headless mode; the wait resolves immediately.
        self.ensure_open()
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            debug!("Closing headless surface after {} flips", self.flips);
            self.open = false;
        }
        Ok(())
    }
}
