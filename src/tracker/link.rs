//! Device Link Abstraction
//!
//! Every device interaction of the session goes through the [`TrackerLink`]
//! trait: text commands, marker messages, remote data-file management,
//! recording control, the interactive setup routine, and file retrieval.
//! Two backends ship with the crate: [`crate::tracker::net::NetLink`] for a
//! real tracker host and [`crate::tracker::dummy::DummyLink`] for simulated
//! operation without hardware.

use std::path::Path;

use thiserror::Error;

use crate::graphics::CalibrationRenderer;

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Device link error types
#[derive(Error, Debug)]
pub enum LinkError {
    /// Establishing the connection failed
    #[error("Connection to tracker host failed: {0}")]
    ConnectionFailed(String),

    /// The tracker rejected a command
    #[error("Command '{command}' rejected: {reason}")]
    CommandRejected {
        /// The command that was sent
        command: String,
        /// The tracker's reason
        reason: String,
    },

    /// Opening the remote data file failed
    #[error("Failed to open remote data file '{0}'")]
    FileOpenFailed(String),

    /// Downloading the remote data file failed
    #[error("Data file transfer failed: {0}")]
    FileTransferFailed(String),

    /// The tracker sent a response that does not fit the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The firmware version string could not be parsed
    #[error("Unparseable tracker version string: '{0}'")]
    VersionParse(String),

    /// The interactive setup routine failed
    #[error("Calibration failed: {0}")]
    CalibrationFailed(String),

    /// Operation on a link that is not connected
    #[error("Link is not connected")]
    NotConnected,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command and data channel to the tracker
///
/// All operations block until the device acknowledges, per the synchronous
/// request/response model of the tracker host software.
#[cfg_attr(test, mockall::automock)]
pub trait TrackerLink {
    /// Send a configuration command (e.g. `file_event_filter = ...`)
    fn send_command(&mut self, command: &str) -> Result<()>;

    /// Send a timestamped marker message over the link
    fn send_message(&mut self, message: &str) -> Result<()>;

    /// Open a data file on the tracker host
    fn open_data_file(&mut self, name: &str) -> Result<()>;

    /// Close the currently open remote data file
    fn close_data_file(&mut self) -> Result<()>;

    /// Place the tracker in offline/configuration mode
    fn set_offline_mode(&mut self) -> Result<()>;

    /// Query the firmware version string
    fn version_string(&mut self) -> Result<String>;

    /// Begin recording the four data-stream classes
    ///
    /// The flags select file samples, file events, link samples, and link
    /// events respectively.
    fn start_recording(
        &mut self,
        file_samples: bool,
        file_events: bool,
        link_samples: bool,
        link_events: bool,
    ) -> Result<()>;

    /// Stop recording
    fn stop_recording(&mut self) -> Result<()>;

    /// Run the interactive setup routine (calibration)
    ///
    /// The tracker drives target presentation through the renderer
    /// capability; this call blocks until the operator finishes.
    fn run_setup(&mut self, renderer: &mut dyn CalibrationRenderer) -> Result<()>;

    /// Abort an in-progress setup routine
    fn abort_setup(&mut self) -> Result<()>;

    /// Download a remote data file to a local path
    fn receive_data_file(&mut self, remote_name: &str, local_path: &Path) -> Result<()>;

    /// Close the connection; safe to call more than once
    fn close(&mut self) -> Result<()>;
}

/// Extract the firmware major version from a tracker version string
///
/// The version string ends in a dotted version number, e.g.
/// `"EYELINK CL 5.10"` yields 5. Used to pick the data-filter tier.
pub fn parse_major_version(version: &str) -> Result<i32> {
    version
        .split_whitespace()
        .last()
        .and_then(|token| token.split('.').next())
        .and_then(|major| major.parse::<i32>().ok())
        .ok_or_else(|| LinkError::VersionParse(version.to_string()))
}
