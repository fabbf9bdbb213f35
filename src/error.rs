//! Error kinds for the analysis and capture layers.
//!
//! Detector-level failures are local to a single tick: the monitor logs them
//! and skips the tick rather than reporting a loudness of zero, which would
//! make a malfunction look like silence. Device-level failures propagate to
//! the CLI so the user can pick a working input.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The sample window handed to a detector was empty or the wrong length.
    #[error("invalid sample window: {0}")]
    InvalidInput(String),

    /// No capture source is present, or the requested device is not in the
    /// enumerated list.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Analysis was requested while the source is not capturing. Treated as a
    /// normal skip by the tick loop, not a failure.
    #[error("capture is not active")]
    CaptureNotActive,
}
