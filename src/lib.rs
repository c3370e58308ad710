//! # gazetrack
//!
//! Eye-tracker session recorder: configures and calibrates an external
//! eye-tracking device, records a session, and retrieves the resulting
//! `.EDF` data file to local storage.
//!
//! # Architecture
//!
//! ```text
//! gazetrack
//!   ├─> Tracker Session (lifecycle state machine, rollback on failure)
//!   ├─> Tracker Link (device command channel: TCP or simulated)
//!   ├─> Calibration Graphics (renderer capability driven by the device)
//!   └─> Display Surface (full-screen calibration display)
//! ```
//!
//! # Session lifecycle
//!
//! Construction walks a strict handshake - connect, open the remote data
//! file, configure data filters and calibration parameters, set up the
//! calibration display - and any failure rolls back everything acquired so
//! far. After that: [`tracker::Session::calibrate`],
//! [`tracker::Session::start`], [`tracker::Session::stop`] (which downloads
//! the data file and tears down), with [`tracker::Session::close`] as the
//! idempotent teardown reachable from every state.
//!
//! ```no_run
//! use gazetrack::tracker::{Session, SessionOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut session = Session::open(SessionOptions::new("/tmp/rec", "ABC123"))?;
//! session.calibrate()?;
//! session.start()?;
//! session.signal("trial_1")?;
//! let edf = session.stop()?;
//! println!("recording saved to {}", edf.display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Recorder configuration
pub mod config;

/// Display surface abstraction and headless implementation
pub mod display;

/// Calibration graphics adapter
pub mod graphics;

/// Tracker session, device link, and data filters
pub mod tracker;

/// Diagnostics and user-facing error formatting
pub mod utils;
