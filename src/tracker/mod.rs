//! Tracker Session Management
//!
//! Everything between "connect to the device" and "the data file is on local
//! disk" lives here. [`session::Session`] is the finite-state controller;
//! [`link::TrackerLink`] abstracts the device command channel with a TCP
//! backend ([`net::NetLink`]) and a simulated one ([`dummy::DummyLink`]);
//! [`filters::DataFilters`] derives the event/sample filter strings from the
//! firmware version tier.

pub mod dummy;
pub mod error;
pub mod filters;
pub mod link;
pub mod net;
pub mod session;

pub use dummy::DummyLink;
pub use error::{Result, TrackerError};
pub use filters::DataFilters;
pub use link::{LinkError, TrackerLink};
pub use net::NetLink;
pub use session::{Session, SessionOptions, SessionState};
