//! Simulated Device Link
//!
//! Stands in for the tracker when no host address is configured. Accepts
//! every command, keeps a transcript for inspection, and synthesizes the
//! data file locally on retrieval so the recording flow can be exercised
//! end-to-end without hardware.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::link::{LinkError, Result, TrackerLink};
use crate::graphics::CalibrationRenderer;

/// Simulated tracker link
#[derive(Debug, Default)]
pub struct DummyLink {
    commands: Vec<String>,
    messages: Vec<String>,
    open_file: Option<String>,
    recording: bool,
    closed: bool,
}

impl DummyLink {
    /// Create a simulated link
    pub fn new() -> Self {
        debug!("Using simulated tracker link");
        Self::default()
    }

    /// Commands accepted so far, in order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Marker messages accepted so far, in order
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    fn ensure_live(&self) -> Result<()> {
        if self.closed {
            Err(LinkError::NotConnected)
        } else {
            Ok(())
        }
    }
}

impl TrackerLink for DummyLink {
    fn send_command(&mut self, command: &str) -> Result<()> {
        self.ensure_live()?;
        debug!("dummy <- {}", command);
        self.commands.push(command.to_string());
        Ok(())
    }

    fn send_message(&mut self, message: &str) -> Result<()> {
        self.ensure_live()?;
        self.messages.push(message.to_string());
        Ok(())
    }

    fn open_data_file(&mut self, name: &str) -> Result<()> {
        self.ensure_live()?;
        self.open_file = Some(name.to_string());
        Ok(())
    }

    fn close_data_file(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.open_file = None;
        Ok(())
    }

    fn set_offline_mode(&mut self) -> Result<()> {
        self.ensure_live()
    }

    fn version_string(&mut self) -> Result<String> {
        // Simulated mode skips the version query; the session treats the
        // device as version 0. Answer something recognizable anyway.
        self.ensure_live()?;
        Ok("SIMULATED 0.0".to_string())
    }

    fn start_recording(
        &mut self,
        _file_samples: bool,
        _file_events: bool,
        _link_samples: bool,
        _link_events: bool,
    ) -> Result<()> {
        self.ensure_live()?;
        self.recording = true;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.recording = false;
        Ok(())
    }

    fn run_setup(&mut self, renderer: &mut dyn CalibrationRenderer) -> Result<()> {
        self.ensure_live()?;
        // No operator and no targets; enter and leave the calibration
        // display so the renderer capability is exercised.
        renderer
            .setup_cal_display()
            .and_then(|_| renderer.exit_cal_display())
            .map_err(|e| LinkError::CalibrationFailed(e.to_string()))
    }

    fn abort_setup(&mut self) -> Result<()> {
        self.ensure_live()
    }

    fn receive_data_file(&mut self, remote_name: &str, local_path: &Path) -> Result<()> {
        self.ensure_live()?;
        let mut payload = format!("** SIMULATED RECORDING {}\n", remote_name);
        for message in &self.messages {
            payload.push_str("MSG ");
            payload.push_str(message);
            payload.push('\n');
        }
        fs::write(local_path, payload)
            .map_err(|e| LinkError::FileTransferFailed(format!("{}: {}", local_path.display(), e)))
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            debug!(
                "Closing simulated link ({} commands, {} messages)",
                self.commands.len(),
                self.messages.len()
            );
            self.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commands_are_recorded() {
        let mut link = DummyLink::new();
        link.send_command("calibration_type = HV9").unwrap();
        link.send_command("clear_screen 0").unwrap();
        assert_eq!(
            link.commands(),
            ["calibration_type = HV9", "clear_screen 0"]
        );
    }

    #[test]
    fn test_receive_writes_messages_into_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("TEST.EDF");

        let mut link = DummyLink::new();
        link.open_data_file("TEST.EDF").unwrap();
        link.send_message("START").unwrap();
        link.send_message("trial_1").unwrap();
        link.close_data_file().unwrap();
        link.receive_data_file("TEST.EDF", &dest).unwrap();

        let contents = std::fs::read_to_string(&dest).unwrap();
        assert!(contents.contains("MSG START"));
        assert!(contents.contains("MSG trial_1"));
    }

    #[test]
    fn test_closed_link_rejects_commands() {
        let mut link = DummyLink::new();
        link.close().unwrap();
        assert!(matches!(
            link.send_command("clear_screen 0"),
            Err(LinkError::NotConnected)
        ));
        // close stays idempotent
        link.close().unwrap();
    }
}
