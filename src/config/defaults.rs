//! Tuning constants and CLI defaults.

/// RMS gain applied before clamping; matches the original tuning.
pub const DEFAULT_SENSITIVITY: f32 = 10.0;
pub const MIN_SENSITIVITY: f32 = 0.1;
pub const MAX_SENSITIVITY: f32 = 50.0;

/// Loudness cutoff for the crossing event.
pub const DEFAULT_THRESHOLD: f32 = 0.75;

/// Analysis cadence. Five milliseconds keeps feedback latency low without
/// starving the capture callbacks.
pub const DEFAULT_TICK_MS: u64 = 5;
pub const MIN_TICK_MS: u64 = 1;
pub const MAX_TICK_MS: u64 = 100;

pub const DEFAULT_RUN_SECONDS: u64 = 30;
pub const MIN_RUN_SECONDS: u64 = 1;
pub const MAX_RUN_SECONDS: u64 = 3_600;

/// In-place meter redraw interval for the CLI; full tick rate would just
/// thrash the terminal.
pub const METER_REDRAW_MS: u64 = 80;
