//! Microphone capture plumbing.
//!
//! Stream callbacks downmix incoming audio to mono and write it into a shared
//! circular buffer; the analysis tick polls the most recent fixed-length
//! window out of that buffer. The `SampleSource` trait is the seam between
//! the platform microphone and the tick loop, so tests can drive the monitor
//! with scripted windows.

use crate::error::MonitorError;

/// Samples handed to the detectors each tick.
pub const SAMPLE_WINDOW_LEN: usize = 1024;

/// Seconds of audio retained in the capture ring, mirroring the one-second
/// looping capture clip of the original implementation.
pub const RING_SECONDS: u32 = 1;

mod dispatch;
mod mic;
mod ring;
#[cfg(test)]
mod tests;

pub use mic::MicSource;
pub use ring::SampleRing;

/// Abstracts the capture side: recording status plus "copy the most recent
/// window of samples".
pub trait SampleSource {
    fn is_capturing(&self) -> bool;

    /// Fill `window` with the latest samples, oldest first. The window length
    /// is fixed for the lifetime of a session; passing a different length is
    /// an `InvalidInput` contract violation.
    fn fetch_window(&mut self, window: &mut [f32]) -> Result<(), MonitorError>;
}
