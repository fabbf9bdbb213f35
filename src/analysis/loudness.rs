//! Smoothed loudness estimation with an edge-triggered threshold event.

use super::DetectorConfig;
use crate::error::MonitorError;

/// Edge-trigger state for the loudness detector. Created fresh when a capture
/// session starts and discarded when it ends.
#[derive(Debug, Clone, Default)]
pub struct LoudnessState {
    /// Last reported loudness, clamped to [0, 1].
    pub level: f32,
    /// True while loudness sits above the threshold; blocks re-triggering.
    pub crossed: bool,
}

/// Result of one loudness tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReading {
    pub level: f32,
    /// True exactly once per rising edge through the threshold.
    pub crossed_edge: bool,
}

/// Compute the RMS loudness of `window`, apply the sensitivity gain, clamp to
/// [0, 1], and run the edge logic against `state`.
///
/// The event fires only on a strict rise above the threshold while the edge is
/// armed, and the edge re-arms only on a strict drop below it. A loudness
/// exactly equal to the threshold changes nothing in either direction; that
/// no-op zone is intentional and covered by tests.
pub fn update(
    window: &[f32],
    cfg: &DetectorConfig,
    state: &mut LoudnessState,
) -> Result<LoudnessReading, MonitorError> {
    if window.is_empty() {
        return Err(MonitorError::InvalidInput(
            "empty sample window".to_string(),
        ));
    }

    let energy: f32 = window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32;
    let level = (energy.sqrt() * cfg.sensitivity).clamp(0.0, 1.0);

    let mut crossed_edge = false;
    if level > cfg.threshold && !state.crossed {
        state.crossed = true;
        crossed_edge = true;
    } else if level < cfg.threshold {
        state.crossed = false;
    }
    state.level = level;

    Ok(LoudnessReading {
        level,
        crossed_edge,
    })
}
