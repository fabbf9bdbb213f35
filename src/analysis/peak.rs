//! Transient peak detection over a short history of per-tick peak amplitudes.

use super::DetectorConfig;
use crate::error::MonitorError;
use std::collections::VecDeque;

/// Fixed-length FIFO of the last N per-tick peak amplitudes, oldest first.
///
/// Initialized to all zeros at session start, so early ticks compare against a
/// silent history and spikes are easy to trigger during warm-up. That startup
/// transient is accepted behavior, not corrected.
#[derive(Debug, Clone)]
pub struct PeakHistory {
    values: VecDeque<f32>,
}

impl PeakHistory {
    pub fn new(len: usize) -> Self {
        let len = len.max(2);
        Self {
            values: std::iter::repeat(0.0).take(len).collect(),
        }
    }

    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self::new(cfg.peak_history_len)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Newest entry (the peak pushed by the most recent tick).
    pub fn latest(&self) -> f32 {
        self.values.back().copied().unwrap_or(0.0)
    }

    /// Drop the oldest entry and append the newest; length never changes.
    fn push_evict(&mut self, value: f32) {
        self.values.pop_front();
        self.values.push_back(value);
    }

    /// All entries except the newest, oldest first.
    fn earlier(&self) -> impl Iterator<Item = f32> + '_ {
        let keep = self.values.len().saturating_sub(1);
        self.values.iter().copied().take(keep)
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<f32> {
        self.values.iter().copied().collect()
    }
}

/// Result of one peak tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakReading {
    /// Maximum absolute amplitude across the window.
    pub peak: f32,
    /// True when no earlier history entry dominates the new peak.
    pub spike: bool,
}

/// Push the window's peak amplitude onto `history` and test whether it
/// dominates the remembered peaks.
///
/// The spike fires iff no earlier entry is `>= peak * cfg.peak_sensitivity`.
/// The history mutates on every call whether or not a spike fires, so a
/// non-spike tick still ages out the oldest entry.
pub fn update(
    window: &[f32],
    cfg: &DetectorConfig,
    history: &mut PeakHistory,
) -> Result<PeakReading, MonitorError> {
    if window.is_empty() {
        return Err(MonitorError::InvalidInput(
            "empty sample window".to_string(),
        ));
    }

    let peak = window.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
    history.push_evict(peak);

    let spike = history.earlier().all(|e| e < peak * cfg.peak_sensitivity);

    Ok(PeakReading { peak, spike })
}
