//! Signal-analysis core: RMS loudness with an edge-triggered threshold
//! crossing, and a sliding-window transient peak detector.
//!
//! Both detectors read the same fixed-length sample window each tick and keep
//! their own small state across ticks. State lives in explicit structs passed
//! by the caller so the update functions stay unit-testable.

mod loudness;
mod peak;

pub use loudness::{LoudnessReading, LoudnessState};
pub use peak::{PeakHistory, PeakReading};

pub use loudness::update as update_loudness;
pub use peak::update as update_peak;

/// Immutable-per-session detector tuning.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Gain applied to the raw RMS before clamping to [0, 1].
    pub sensitivity: f32,
    /// Loudness cutoff for the edge-triggered crossing event, in [0, 1].
    pub threshold: f32,
    /// Number of per-tick peaks kept for the spike test (at least 2).
    pub peak_history_len: usize,
    /// An earlier peak at or above `latest * peak_sensitivity` vetoes a spike.
    pub peak_sensitivity: f32,
    /// Reserved tuning knob carried over from the original feedback
    /// controller; the spike test does not consult it.
    pub peak_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sensitivity: 10.0,
            threshold: 0.75,
            peak_history_len: 5,
            peak_sensitivity: 5.0,
            peak_threshold: 0.2,
        }
    }
}
