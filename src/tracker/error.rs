//! Tracker Session Error Types

use std::path::PathBuf;

use thiserror::Error;

use crate::display::DisplayError;
use crate::tracker::link::LinkError;

/// Result type for tracker session operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Tracker session error types
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Data file base name failed validation
    #[error("Invalid data file name: {0}")]
    InvalidFileName(String),

    /// Screen index failed validation
    #[error("The screen ID should be a 0-indexed integer, got {0}")]
    InvalidScreen(i32),

    /// Resolution failed validation
    #[error("Invalid screen resolution: {0}")]
    InvalidResolution(String),

    /// Output directory could not be created
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        /// The directory that could not be created
        path: PathBuf,
        /// Underlying filesystem error
        source: std::io::Error,
    },

    /// Another session holds the device in this process
    #[error("A tracker session is already active in this process")]
    SessionActive,

    /// Operation called in the wrong lifecycle state
    #[error("Cannot {operation}: session is {actual}, expected {expected}")]
    InvalidState {
        /// The operation that was attempted
        operation: &'static str,
        /// State the operation requires
        expected: &'static str,
        /// State the session is actually in
        actual: &'static str,
    },

    /// Session resources were already released
    #[error("Session is closed")]
    Closed,

    /// Device link error
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Display surface error
    #[error("Display error: {0}")]
    Display(#[from] DisplayError),
}
