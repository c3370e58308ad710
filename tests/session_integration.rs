//! End-to-end lifecycle tests against the simulated device.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::TempDir;

use gazetrack::display::{DisplaySurface, HeadlessSurface, SurfaceRequest};
use gazetrack::graphics::CalibrationRenderer;
use gazetrack::tracker::link::{self, LinkError, TrackerLink};
use gazetrack::tracker::{Session, SessionOptions, SessionState, TrackerError};

/// One session per process; serialize the tests that hold the slot.
static SLOT: Mutex<()> = Mutex::new(());

fn slot() -> MutexGuard<'static, ()> {
    SLOT.lock().unwrap_or_else(|e| e.into_inner())
}

fn headless(request: &SurfaceRequest) -> gazetrack::display::Result<Box<dyn DisplaySurface>> {
    Ok(Box::new(HeadlessSurface::open(request)?))
}

/// Link fake with switchable failures and an observable close flag.
#[derive(Default)]
struct ProbeLink {
    fail_file_open: bool,
    fail_transfer: bool,
    closed: Arc<AtomicBool>,
}

impl TrackerLink for ProbeLink {
    fn send_command(&mut self, _command: &str) -> link::Result<()> {
        Ok(())
    }

    fn send_message(&mut self, _message: &str) -> link::Result<()> {
        Ok(())
    }

    fn open_data_file(&mut self, name: &str) -> link::Result<()> {
        if self.fail_file_open {
            Err(LinkError::FileOpenFailed(name.to_string()))
        } else {
            Ok(())
        }
    }

    fn close_data_file(&mut self) -> link::Result<()> {
        Ok(())
    }

    fn set_offline_mode(&mut self) -> link::Result<()> {
        Ok(())
    }

    fn version_string(&mut self) -> link::Result<String> {
        Ok("EYELINK CL 5.10".to_string())
    }

    fn start_recording(
        &mut self,
        _file_samples: bool,
        _file_events: bool,
        _link_samples: bool,
        _link_events: bool,
    ) -> link::Result<()> {
        Ok(())
    }

    fn stop_recording(&mut self) -> link::Result<()> {
        Ok(())
    }

    fn run_setup(&mut self, _renderer: &mut dyn CalibrationRenderer) -> link::Result<()> {
        Ok(())
    }

    fn abort_setup(&mut self) -> link::Result<()> {
        Ok(())
    }

    fn receive_data_file(&mut self, _remote_name: &str, _local_path: &Path) -> link::Result<()> {
        if self.fail_transfer {
            Err(LinkError::FileTransferFailed("simulated drop".into()))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) -> link::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_simulated_session_reaches_display_ready() {
    let _slot = slot();
    let tmp = TempDir::new().unwrap();
    let rec_dir = tmp.path().join("rec");

    let session = Session::open(SessionOptions::new(&rec_dir, "ABC123")).unwrap();

    assert_eq!(session.state(), SessionState::DisplayReady);
    assert_eq!(session.version(), 0);
    assert!(!session.filters().has_head_target());
    assert!(session.is_simulated());
    assert!(rec_dir.is_dir(), "output directory must be created");
    assert_eq!(session.edf_path(), rec_dir.join("ABC123.EDF"));
}

#[test]
fn test_too_long_name_rejected_before_any_connection() {
    let _slot = slot();
    let tmp = TempDir::new().unwrap();

    let attempted = Arc::new(AtomicBool::new(false));
    let probe = attempted.clone();

    let err = Session::open_with(
        SessionOptions::new(tmp.path(), "TOOLONGNAME"),
        move |_| {
            probe.store(true, Ordering::SeqCst);
            Ok(Box::new(ProbeLink::default()) as Box<dyn TrackerLink>)
        },
        headless,
    )
    .unwrap_err();

    assert!(matches!(err, TrackerError::InvalidFileName(_)));
    assert!(
        !attempted.load(Ordering::SeqCst),
        "no connection may be attempted after a validation failure"
    );
}

#[test]
fn test_start_stop_retrieves_edf_and_tears_down() {
    let _slot = slot();
    let tmp = TempDir::new().unwrap();

    let mut session = Session::open(SessionOptions::new(tmp.path(), "ABC123")).unwrap();
    session.calibrate().unwrap();
    session.start().unwrap();
    session.signal("trial_1").unwrap();
    let path = session.stop().unwrap();

    assert_eq!(path, tmp.path().join("ABC123.EDF"));
    assert!(path.is_file(), "retrieved data file must exist");
    assert_eq!(session.state(), SessionState::Closed);

    // close stays idempotent after teardown
    session.close();
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_file_open_failure_releases_connection() {
    let _slot = slot();
    let tmp = TempDir::new().unwrap();

    let closed = Arc::new(AtomicBool::new(false));
    let link_closed = closed.clone();

    let err = Session::open_with(
        SessionOptions::new(tmp.path(), "ABC123"),
        move |_| {
            Ok(Box::new(ProbeLink {
                fail_file_open: true,
                closed: link_closed,
                ..Default::default()
            }) as Box<dyn TrackerLink>)
        },
        headless,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        TrackerError::Link(LinkError::FileOpenFailed(_))
    ));
    assert!(
        closed.load(Ordering::SeqCst),
        "the step-1 connection must be released"
    );
}

#[test]
fn test_transfer_failure_still_tears_down() {
    let _slot = slot();
    let tmp = TempDir::new().unwrap();

    let closed = Arc::new(AtomicBool::new(false));
    let link_closed = closed.clone();

    let mut session = Session::open_with(
        SessionOptions::new(tmp.path(), "ABC123"),
        move |_| {
            Ok(Box::new(ProbeLink {
                fail_transfer: true,
                closed: link_closed,
                ..Default::default()
            }) as Box<dyn TrackerLink>)
        },
        headless,
    )
    .unwrap();

    session.start().unwrap();
    let err = session.stop().unwrap_err();

    assert!(matches!(
        err,
        TrackerError::Link(LinkError::FileTransferFailed(_))
    ));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn test_second_session_rejected_while_active() {
    let _slot = slot();
    let tmp = TempDir::new().unwrap();

    let first = Session::open(SessionOptions::new(tmp.path(), "FIRST")).unwrap();
    let err = Session::open(SessionOptions::new(tmp.path(), "SECOND")).unwrap_err();
    assert!(matches!(err, TrackerError::SessionActive));

    drop(first);
    // the slot frees on teardown
    let second = Session::open(SessionOptions::new(tmp.path(), "SECOND")).unwrap();
    assert_eq!(second.state(), SessionState::DisplayReady);
}

#[test]
fn test_real_host_version_unlocks_head_target() {
    let _slot = slot();
    let tmp = TempDir::new().unwrap();

    let session = Session::open_with(
        SessionOptions::new(tmp.path(), "ABC123").with_host("10.0.0.1"),
        |_| Ok(Box::new(ProbeLink::default()) as Box<dyn TrackerLink>),
        headless,
    )
    .unwrap();

    assert_eq!(session.version(), 5);
    assert!(session.filters().has_head_target());
}
