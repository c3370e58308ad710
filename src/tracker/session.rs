//! Tracker Session
//!
//! Finite-state controller for one device-connection-to-teardown lifecycle:
//!
//! ```text
//! open():  Connected -> FileOpen -> Configured -> DisplayReady
//! calibrate():  DisplayReady -> Calibrating -> DisplayReady
//! start():      DisplayReady -> Recording
//! stop():       Recording -> Closed   (data file retrieved on the way)
//! close():      any -> Closed         (idempotent, never fails)
//! ```
//!
//! Construction performs four ordered side-effecting steps; a failure at any
//! step rolls back everything acquired so far before the error reaches the
//! caller. There is never a state with an open device file and no display,
//! or a live connection after a failed setup. Exactly one session may be
//! live per process: the device and the display are singular resources.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::dummy::DummyLink;
use super::error::{Result, TrackerError};
use super::filters::DataFilters;
use super::link::{self, parse_major_version, TrackerLink};
use super::net::NetLink;
use crate::display::{self, Color, DisplaySurface, HeadlessSurface, SurfaceRequest};
use crate::graphics::{CalibrationGraphics, CalibrationRenderer, TargetStyle};

/// Default display resolution when none is requested
pub const DEFAULT_RESOLUTION: (u32, u32) = (1920, 1080);

/// Calibration scheme: 9-point horizontal/vertical grid
const CALIBRATION_TYPE: &str = "HV9";

/// Physical button bound to "accept target fixation"
const ACCEPT_BUTTON: u32 = 5;

/// Calibration target diameter in pixels
const TARGET_SIZE_PX: u32 = 24;

/// Settle time after asking the tracker to clear its screen
const SCREEN_CLEAR_SETTLE: Duration = Duration::from_millis(500);

/// Instruction shown to the operator before the setup routine
const CALIBRATION_PROMPT: &str = "Press ENTER twice to display the tracker setup menu.";

/// One live session per process; the device and display are not shareable.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Holds the process-wide session slot; releasing happens on drop.
#[derive(Debug)]
struct SessionGuard;

impl SessionGuard {
    fn acquire() -> Result<Self> {
        SESSION_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| SessionGuard)
            .map_err(|_| TrackerError::SessionActive)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SESSION_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Lifecycle state of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No resources acquired yet; never observable on a constructed session
    Uninitialized,
    /// Connection established, no remote file yet
    Connected,
    /// Remote data file open
    FileOpen,
    /// Filters and calibration parameters sent
    Configured,
    /// Display surface and calibration graphics ready
    DisplayReady,
    /// Interactive setup routine running
    Calibrating,
    /// Recording in progress
    Recording,
    /// All resources released
    Closed,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Connected => "connected",
            SessionState::FileOpen => "file-open",
            SessionState::Configured => "configured",
            SessionState::DisplayReady => "display-ready",
            SessionState::Calibrating => "calibrating",
            SessionState::Recording => "recording",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Construction parameters for a [`Session`]
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory the retrieved data file is saved into; created if missing
    pub output_dir: PathBuf,

    /// Base name of the data file, 1-8 alphanumeric/underscore characters,
    /// without extension (a trailing `.EDF` is stripped)
    pub base_name: String,

    /// Tracker host address; `None` selects the simulated device
    pub host: Option<String>,

    /// 0-indexed screen for the calibration display
    pub screen: Option<i32>,

    /// Requested display resolution (width, height)
    pub resolution: Option<(i32, i32)>,

    /// Calibration target color
    pub foreground: Color,

    /// Calibration display background color
    pub background: Color,
}

impl SessionOptions {
    /// Options with defaults: simulated device, screen 0, 1920x1080,
    /// mid-gray targets on black
    pub fn new(output_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: base_name.into(),
            host: None,
            screen: None,
            resolution: None,
            foreground: Color::MID_GRAY,
            background: Color::BLACK,
        }
    }

    /// Set the tracker host address
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the screen index
    pub fn with_screen(mut self, screen: i32) -> Self {
        self.screen = Some(screen);
        self
    }

    /// Set the requested display resolution
    pub fn with_resolution(mut self, width: i32, height: i32) -> Self {
        self.resolution = Some((width, height));
        self
    }

    /// Set calibration foreground and background colors
    pub fn with_colors(mut self, foreground: Color, background: Color) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    /// Validate and normalize, creating the output directory if needed
    ///
    /// Runs entirely before any device interaction, in a fixed order:
    /// output path, base name, screen index, resolution.
    fn validate(&self) -> Result<ValidatedOptions> {
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir).map_err(|source| {
                TrackerError::OutputDir {
                    path: self.output_dir.clone(),
                    source,
                }
            })?;
        }
        let base_name = normalize_base_name(&self.base_name)?;
        let screen = validate_screen(self.screen)?;
        let resolution = validate_resolution(self.resolution)?;
        Ok(ValidatedOptions {
            output_dir: self.output_dir.clone(),
            base_name,
            host: self.host.clone(),
            screen,
            resolution,
            foreground: self.foreground,
            background: self.background,
        })
    }
}

/// Options after validation, with defaults resolved
#[derive(Debug, Clone)]
struct ValidatedOptions {
    output_dir: PathBuf,
    base_name: String,
    host: Option<String>,
    screen: u32,
    resolution: (u32, u32),
    foreground: Color,
    background: Color,
}

pub(crate) fn normalize_base_name(name: &str) -> Result<String> {
    let name = name
        .strip_suffix(".EDF")
        .or_else(|| name.strip_suffix(".edf"))
        .unwrap_or(name);
    if name.is_empty() {
        return Err(TrackerError::InvalidFileName(
            "the base name must not be empty".into(),
        ));
    }
    if name.len() > 8 {
        return Err(TrackerError::InvalidFileName(format!(
            "'{}' exceeds 8 characters",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TrackerError::InvalidFileName(format!(
            "'{}' contains characters other than letters, digits and '_'",
            name
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn validate_screen(screen: Option<i32>) -> Result<u32> {
    match screen {
        None => Ok(0),
        Some(s) if s >= 0 => Ok(s as u32),
        Some(s) => Err(TrackerError::InvalidScreen(s)),
    }
}

pub(crate) fn validate_resolution(resolution: Option<(i32, i32)>) -> Result<(u32, u32)> {
    match resolution {
        None => Ok(DEFAULT_RESOLUTION),
        Some((w, h)) if w >= 0 && h >= 0 => Ok((w as u32, h as u32)),
        Some((w, h)) => Err(TrackerError::InvalidResolution(format!(
            "({}, {}) has a negative component",
            w, h
        ))),
    }
}

/// One continuous device-connection-to-teardown lifecycle
///
/// Owns the device link and the calibration graphics (which in turn owns
/// the display surface) exclusively; [`Session::close`] releases both and
/// runs automatically on drop.
pub struct Session {
    guard: Option<SessionGuard>,
    link: Option<Box<dyn TrackerLink>>,
    graphics: Option<CalibrationGraphics>,
    state: SessionState,
    version: i32,
    filters: DataFilters,
    output_dir: PathBuf,
    base_name: String,
    simulated: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("guard", &self.guard)
            .field("link", &self.link.as_ref().map(|_| "<link>"))
            .field("graphics", &self.graphics.as_ref().map(|_| "<graphics>"))
            .field("state", &self.state)
            .field("version", &self.version)
            .field("filters", &self.filters)
            .field("output_dir", &self.output_dir)
            .field("base_name", &self.base_name)
            .field("simulated", &self.simulated)
            .finish()
    }
}

impl Session {
    /// Open a session with the built-in backends
    ///
    /// A configured host address selects the TCP link; otherwise the
    /// simulated device is used. The display is headless; windowed stimulus
    /// backends go through [`Session::open_with`].
    pub fn open(options: SessionOptions) -> Result<Self> {
        Self::open_with(
            options,
            |host| match host {
                Some(h) => Ok(Box::new(NetLink::connect(h)?) as Box<dyn TrackerLink>),
                None => Ok(Box::new(DummyLink::new()) as Box<dyn TrackerLink>),
            },
            |request| Ok(Box::new(HeadlessSurface::open(request)?) as Box<dyn DisplaySurface>),
        )
    }

    /// Open a session with injected link and surface backends
    ///
    /// `connect` receives the validated host address (`None` = simulated)
    /// and `open_surface` the resolved surface request. Both run inside the
    /// ordered setup sequence, so their failures roll back like any other
    /// setup failure.
    pub fn open_with<L, S>(options: SessionOptions, connect: L, open_surface: S) -> Result<Self>
    where
        L: FnOnce(Option<&str>) -> link::Result<Box<dyn TrackerLink>>,
        S: FnOnce(&SurfaceRequest) -> display::Result<Box<dyn DisplaySurface>>,
    {
        let validated = options.validate()?;
        let guard = SessionGuard::acquire()?;

        let mut session = Session {
            guard: Some(guard),
            link: None,
            graphics: None,
            state: SessionState::Uninitialized,
            version: 0,
            filters: DataFilters::for_version(0),
            output_dir: validated.output_dir.clone(),
            base_name: validated.base_name.clone(),
            simulated: validated.host.is_none(),
        };

        if let Err(e) = session.set_up(&validated, connect, open_surface) {
            warn!("Session setup failed in state {}: {}", session.state, e);
            session.close();
            return Err(e);
        }
        info!(
            "Session ready: {}.EDF in {} ({})",
            session.base_name,
            session.output_dir.display(),
            if session.simulated {
                "simulated".to_string()
            } else {
                format!("firmware v{}", session.version)
            }
        );
        Ok(session)
    }

    fn set_up<L, S>(&mut self, options: &ValidatedOptions, connect: L, open_surface: S) -> Result<()>
    where
        L: FnOnce(Option<&str>) -> link::Result<Box<dyn TrackerLink>>,
        S: FnOnce(&SurfaceRequest) -> display::Result<Box<dyn DisplaySurface>>,
    {
        // Step 1: connect to the tracker host
        info!(
            "Connecting ({})",
            options.host.as_deref().unwrap_or("simulated")
        );
        self.link = Some(connect(options.host.as_deref())?);
        self.state = SessionState::Connected;

        // Step 2: open the remote data file
        let remote_name = format!("{}.EDF", self.base_name);
        info!("Opening remote data file {}", remote_name);
        self.link_mut()?.open_data_file(&remote_name)?;
        self.state = SessionState::FileOpen;

        // Step 3: configure filters and calibration parameters
        self.configure()?;
        self.state = SessionState::Configured;

        // Step 4: calibration graphics environment
        self.set_up_display(options, open_surface)?;
        self.state = SessionState::DisplayReady;
        Ok(())
    }

    fn configure(&mut self) -> Result<()> {
        let simulated = self.simulated;
        let link = self.link_mut()?;
        link.set_offline_mode()?;

        let mut version = 0;
        if !simulated {
            let vstr = link.version_string()?;
            version = parse_major_version(&vstr)?;
            debug!("Tracker firmware: {} (major {})", vstr.trim(), version);
        }

        let filters = DataFilters::for_version(version);
        link.send_command(&format!("file_event_filter = {}", filters.file_events))?;
        link.send_command(&format!("file_sample_data = {}", filters.file_samples))?;
        link.send_command(&format!("link_event_filter = {}", filters.link_events))?;
        link.send_command(&format!("link_sample_data = {}", filters.link_samples))?;

        link.send_command(&format!("calibration_type = {}", CALIBRATION_TYPE))?;
        link.send_command(&format!(
            "button_function {} 'accept_target_fixation'",
            ACCEPT_BUTTON
        ))?;

        self.version = version;
        self.filters = filters;
        Ok(())
    }

    fn set_up_display<S>(&mut self, options: &ValidatedOptions, open_surface: S) -> Result<()>
    where
        S: FnOnce(&SurfaceRequest) -> display::Result<Box<dyn DisplaySurface>>,
    {
        let request = SurfaceRequest {
            screen: options.screen,
            resolution: options.resolution,
            background: options.background,
            fullscreen: true,
        };
        let surface = open_surface(&request)?;
        let (width, height) = surface.size();
        debug!("Display surface is {}x{}", width, height);

        // The adapter owns the surface from here on, so a failure below
        // releases it through the normal teardown path.
        let mut graphics = CalibrationGraphics::new(surface, options.foreground, options.background);
        graphics.set_target_style(TargetStyle::Circle, TARGET_SIZE_PX);
        self.graphics = Some(graphics);

        // Tell the tracker how to map its coordinate space to the display.
        self.link_mut()?.send_command(&format!(
            "screen_pixel_coords = 0 0 {} {}",
            width - 1,
            height - 1
        ))?;
        Ok(())
    }

    /// Run the interactive calibration routine
    ///
    /// Activates the display, shows the operator instructions (dismissed by
    /// keypress), then hands the renderer to the tracker for the setup
    /// routine. A calibration failure aborts the routine, tears the session
    /// down, and propagates.
    pub fn calibrate(&mut self) -> Result<()> {
        self.expect_state(SessionState::DisplayReady, "calibrate")?;
        self.state = SessionState::Calibrating;
        info!("Starting calibration ({})", CALIBRATION_TYPE);

        if let Err(e) = self.run_calibration() {
            if let Some(link) = self.link.as_deref_mut() {
                if let Err(abort) = link.abort_setup() {
                    debug!("Abort after calibration failure failed too: {}", abort);
                }
            }
            self.close();
            return Err(e);
        }

        self.state = SessionState::DisplayReady;
        info!("Calibration finished");
        Ok(())
    }

    fn run_calibration(&mut self) -> Result<()> {
        let graphics = self.graphics.as_mut().ok_or(TrackerError::Closed)?;
        graphics.activate()?;
        graphics.show_message(CALIBRATION_PROMPT, true)?;

        let link = self.link.as_deref_mut().ok_or(TrackerError::Closed)?;
        link.run_setup(graphics)?;
        Ok(())
    }

    /// Begin recording all four data-stream classes
    ///
    /// Emits a `START` marker over the link. A device failure here is
    /// fatal: the session tears down before the error propagates.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(SessionState::DisplayReady, "start")?;
        if let Err(e) = self.begin_recording() {
            self.close();
            return Err(e);
        }
        self.state = SessionState::Recording;
        info!("Recording started");
        Ok(())
    }

    fn begin_recording(&mut self) -> Result<()> {
        let link = self.link_mut()?;
        link.start_recording(true, true, true, true)?;
        link.send_message("START")?;
        Ok(())
    }

    /// Send an arbitrary marker message, timestamped by the device
    ///
    /// Accepted in any state with a live connection.
    pub fn signal(&mut self, value: &str) -> Result<()> {
        self.link_mut()?.send_message(value)?;
        Ok(())
    }

    /// Stop recording and retrieve the data file
    ///
    /// Returns the local path of the downloaded file. The session is fully
    /// torn down afterwards, whether or not the download succeeded; a
    /// download failure still reaches the caller.
    pub fn stop(&mut self) -> Result<PathBuf> {
        self.expect_state(SessionState::Recording, "stop")?;
        let result = self.finish_recording();
        self.close();
        result
    }

    fn finish_recording(&mut self) -> Result<PathBuf> {
        let remote_name = format!("{}.EDF", self.base_name);
        let local_path = self.output_dir.join(&remote_name);

        let link = self.link_mut()?;
        link.stop_recording()?;
        link.set_offline_mode()?;

        // Give the tracker time to finish clearing its own screen before
        // the data file is closed.
        link.send_command("clear_screen 0")?;
        thread::sleep(SCREEN_CLEAR_SETTLE);

        link.close_data_file()?;
        info!("Retrieving {} to {}", remote_name, local_path.display());
        link.receive_data_file(&remote_name, &local_path)?;
        Ok(local_path)
    }

    /// Release the connection, display, and the process session slot
    ///
    /// Idempotent and infallible: errors while closing the link or the
    /// surface are logged and swallowed, since this runs inside other
    /// failure paths and must always complete.
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.close() {
                debug!("Link close failed: {}", e);
            }
        }
        if let Some(mut graphics) = self.graphics.take() {
            graphics.close();
        }
        if self.guard.take().is_some() {
            debug!("Session closed");
        }
        self.state = SessionState::Closed;
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Firmware major version (0 in simulated mode)
    pub fn version(&self) -> i32 {
        self.version
    }

    /// The filter set sent during configuration
    pub fn filters(&self) -> &DataFilters {
        &self.filters
    }

    /// Whether the session runs against the simulated device
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Local path the data file is (or will be) saved to
    pub fn edf_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.EDF", self.base_name))
    }

    /// Validated data file base name
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    fn link_mut(&mut self) -> Result<&mut (dyn TrackerLink + 'static)> {
        self.link.as_deref_mut().ok_or(TrackerError::Closed)
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TrackerError::InvalidState {
                operation,
                expected: expected.name(),
                actual: self.state.name(),
            })
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::link::{LinkError, MockTrackerLink};
    use std::sync::{Arc, Mutex, MutexGuard};
    use tempfile::TempDir;

    /// The process-wide session slot is shared by every test in this
    /// binary; serialize the ones that occupy it.
    static SLOT: Mutex<()> = Mutex::new(());

    fn slot() -> MutexGuard<'static, ()> {
        SLOT.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn headless(
        request: &SurfaceRequest,
    ) -> crate::display::Result<Box<dyn DisplaySurface>> {
        Ok(Box::new(HeadlessSurface::open(request)?))
    }

    fn options(dir: &TempDir) -> SessionOptions {
        SessionOptions::new(dir.path(), "ABC1")
    }

    #[test]
    fn test_configuration_commands() {
        let _slot = slot();
        let dir = TempDir::new().unwrap();

        let sent = Arc::new(Mutex::new(Vec::new()));
        let log = sent.clone();

        let mut mock = MockTrackerLink::new();
        mock.expect_open_data_file()
            .withf(|name| name == "ABC1.EDF")
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_set_offline_mode().times(1).returning(|| Ok(()));
        mock.expect_send_command().returning(move |cmd| {
            log.lock().unwrap().push(cmd.to_string());
            Ok(())
        });
        mock.expect_close().times(1).returning(|| Ok(()));

        let session = Session::open_with(options(&dir), |_| Ok(Box::new(mock)), headless).unwrap();
        assert_eq!(session.state(), SessionState::DisplayReady);
        assert_eq!(session.version(), 0);
        drop(session);

        let sent = sent.lock().unwrap();
        assert!(sent
            .iter()
            .any(|c| c.starts_with("file_event_filter = LEFT,RIGHT,FIXATION")));
        assert!(sent.iter().any(|c| c.starts_with("file_sample_data = ")));
        assert!(sent.iter().any(|c| c.starts_with("link_event_filter = ")));
        assert!(sent.iter().any(|c| c.starts_with("link_sample_data = ")));
        assert!(sent.contains(&"calibration_type = HV9".to_string()));
        assert!(sent.contains(&"button_function 5 'accept_target_fixation'".to_string()));
        assert!(sent.contains(&"screen_pixel_coords = 0 0 1919 1079".to_string()));
        // Simulated mode must not include head-target sample data.
        assert!(!sent.iter().any(|c| c.contains("HTARGET")));
    }

    #[test]
    fn test_version_tier_selects_head_target_filters() {
        let _slot = slot();
        let dir = TempDir::new().unwrap();

        let mut mock = MockTrackerLink::new();
        mock.expect_open_data_file().returning(|_| Ok(()));
        mock.expect_set_offline_mode().returning(|| Ok(()));
        mock.expect_version_string()
            .times(1)
            .returning(|| Ok("EYELINK CL 5.10".to_string()));
        mock.expect_send_command().returning(|_| Ok(()));
        mock.expect_close().returning(|| Ok(()));

        let session = Session::open_with(
            options(&dir).with_host("10.0.0.1"),
            |_| Ok(Box::new(mock)),
            headless,
        )
        .unwrap();
        assert_eq!(session.version(), 5);
        assert!(session.filters().has_head_target());
        assert!(!session.is_simulated());
    }

    #[test]
    fn test_file_open_failure_rolls_back_connection() {
        let _slot = slot();
        let dir = TempDir::new().unwrap();

        let mut mock = MockTrackerLink::new();
        mock.expect_open_data_file()
            .times(1)
            .returning(|name| Err(LinkError::FileOpenFailed(name.to_string())));
        mock.expect_close().times(1).returning(|| Ok(()));

        let err = Session::open_with(options(&dir), |_| Ok(Box::new(mock)), headless).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Link(LinkError::FileOpenFailed(_))
        ));
    }

    #[test]
    fn test_calibration_failure_tears_down() {
        let _slot = slot();
        let dir = TempDir::new().unwrap();

        let mut mock = MockTrackerLink::new();
        mock.expect_open_data_file().returning(|_| Ok(()));
        mock.expect_set_offline_mode().returning(|| Ok(()));
        mock.expect_send_command().returning(|_| Ok(()));
        mock.expect_run_setup()
            .times(1)
            .returning(|_| Err(LinkError::CalibrationFailed("operator abort".into())));
        mock.expect_abort_setup().times(1).returning(|| Ok(()));
        mock.expect_close().times(1).returning(|| Ok(()));

        let mut session =
            Session::open_with(options(&dir), |_| Ok(Box::new(mock)), headless).unwrap();
        let err = session.calibrate().unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Link(LinkError::CalibrationFailed(_))
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_start_failure_is_fatal() {
        let _slot = slot();
        let dir = TempDir::new().unwrap();

        let mut mock = MockTrackerLink::new();
        mock.expect_open_data_file().returning(|_| Ok(()));
        mock.expect_set_offline_mode().returning(|| Ok(()));
        mock.expect_send_command().returning(|_| Ok(()));
        mock.expect_start_recording()
            .times(1)
            .returning(|_, _, _, _| Err(LinkError::NotConnected));
        mock.expect_close().times(1).returning(|| Ok(()));

        let mut session =
            Session::open_with(options(&dir), |_| Ok(Box::new(mock)), headless).unwrap();
        assert!(session.start().is_err());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_stop_tears_down_despite_transfer_failure() {
        let _slot = slot();
        let dir = TempDir::new().unwrap();

        let mut mock = MockTrackerLink::new();
        mock.expect_open_data_file().returning(|_| Ok(()));
        mock.expect_set_offline_mode().returning(|| Ok(()));
        mock.expect_send_command().returning(|_| Ok(()));
        mock.expect_start_recording().returning(|_, _, _, _| Ok(()));
        mock.expect_send_message().returning(|_| Ok(()));
        mock.expect_stop_recording().times(1).returning(|| Ok(()));
        mock.expect_close_data_file().times(1).returning(|| Ok(()));
        mock.expect_receive_data_file()
            .times(1)
            .returning(|_, _| Err(LinkError::FileTransferFailed("host went away".into())));
        mock.expect_close().times(1).returning(|| Ok(()));

        let mut session =
            Session::open_with(options(&dir), |_| Ok(Box::new(mock)), headless).unwrap();
        session.start().unwrap();
        let err = session.stop().unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Link(LinkError::FileTransferFailed(_))
        ));
        assert_eq!(session.state(), SessionState::Closed);
        // Second close stays a no-op.
        session.close();
    }

    #[test]
    fn test_operations_in_wrong_state_are_rejected() {
        let _slot = slot();
        let dir = TempDir::new().unwrap();

        let mut session = Session::open(options(&dir)).unwrap();
        // stop before start: rejected, session untouched
        assert!(matches!(
            session.stop(),
            Err(TrackerError::InvalidState { operation: "stop", .. })
        ));
        assert_eq!(session.state(), SessionState::DisplayReady);

        session.start().unwrap();
        assert!(matches!(
            session.start(),
            Err(TrackerError::InvalidState { operation: "start", .. })
        ));

        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
    }

    mod validation {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn test_extension_stripping() {
            assert_eq!(normalize_base_name("TEST.EDF").unwrap(), "TEST");
            assert_eq!(normalize_base_name("test.edf").unwrap(), "test");
            assert_eq!(normalize_base_name("TEST").unwrap(), "TEST");
        }

        #[test]
        fn test_screen_bounds() {
            assert_eq!(validate_screen(None).unwrap(), 0);
            assert_eq!(validate_screen(Some(2)).unwrap(), 2);
            assert!(matches!(
                validate_screen(Some(-1)),
                Err(TrackerError::InvalidScreen(-1))
            ));
        }

        #[test]
        fn test_resolution_defaults_and_bounds() {
            assert_eq!(validate_resolution(None).unwrap(), DEFAULT_RESOLUTION);
            assert_eq!(validate_resolution(Some((800, 600))).unwrap(), (800, 600));
            assert!(validate_resolution(Some((-800, 600))).is_err());
            assert!(validate_resolution(Some((800, -600))).is_err());
        }

        proptest! {
            #[test]
            fn valid_names_pass(name in "[A-Za-z0-9_]{1,8}") {
                prop_assert_eq!(normalize_base_name(&name).unwrap(), name);
            }

            #[test]
            fn long_names_fail(name in "[A-Za-z0-9_]{9,32}") {
                prop_assert!(normalize_base_name(&name).is_err());
            }

            #[test]
            fn non_alphanumeric_names_fail(name in "[A-Za-z0-9]{0,6}[-+ .:@#]{1,2}") {
                prop_assert!(normalize_base_name(&name).is_err());
            }

            #[test]
            fn non_negative_screens_pass(screen in 0i32..64) {
                prop_assert_eq!(validate_screen(Some(screen)).unwrap(), screen as u32);
            }

            #[test]
            fn negative_screens_fail(screen in i32::MIN..0) {
                prop_assert!(validate_screen(Some(screen)).is_err());
            }
        }
    }
}
