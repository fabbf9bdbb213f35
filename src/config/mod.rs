//! Command-line parsing and validation helpers.

pub mod defaults;
mod validation;

use clap::Parser;
use defaults::{
    DEFAULT_RUN_SECONDS, DEFAULT_SENSITIVITY, DEFAULT_THRESHOLD, DEFAULT_TICK_MS,
};
use std::path::PathBuf;

/// CLI options for the screamwatch monitor. Validated before anything opens a
/// device or a preference file.
#[derive(Debug, Parser, Clone)]
#[command(about = "screamwatch - live microphone loudness and peak monitor", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name (persisted for later runs)
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Gain applied to the RMS loudness before clamping to [0, 1]
    #[arg(long, default_value_t = DEFAULT_SENSITIVITY)]
    pub sensitivity: f32,

    /// Loudness level that triggers the threshold-crossing event
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f32,

    /// Analysis cadence in milliseconds
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// How long to monitor before exiting (seconds)
    #[arg(long, default_value_t = DEFAULT_RUN_SECONDS)]
    pub seconds: u64,

    /// Preference file location (defaults to the platform config directory)
    #[arg(long = "prefs-path")]
    pub prefs_path: Option<PathBuf>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SCREAMWATCH_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SCREAMWATCH_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Record per-tick timing traces and a session timing summary
    #[arg(long)]
    pub log_timings: bool,
}
