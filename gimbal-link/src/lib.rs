//! Session layer for a motion hub speaking the shared transport protocol
//! over a half-duplex byte bus.
//!
//! [`Session`] owns the bus, the per-channel sequence counters and the
//! decoded sensor state. Callers bring the bus as a [`Transport`]
//! implementation and drive the session with [`Session::poll`].

pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod transport;

mod frame;

pub use config::SessionConfig;
pub use error::SessionError;
pub use session::{Poll, Session, SessionPhase};
pub use state::{
    Accuracy, ActivityReading, QuaternionReading, ReportKind, SessionState, VectorReading,
};
pub use transport::Transport;
