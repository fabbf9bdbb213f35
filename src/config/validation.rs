use super::defaults::{
    MAX_RUN_SECONDS, MAX_SENSITIVITY, MAX_TICK_MS, MIN_RUN_SECONDS, MIN_SENSITIVITY, MIN_TICK_MS,
};
use super::AppConfig;
use crate::analysis::DetectorConfig;
use anyhow::{bail, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values against their allowed ranges.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&self.sensitivity) {
            bail!(
                "--sensitivity must be between {MIN_SENSITIVITY} and {MAX_SENSITIVITY}, got {}",
                self.sensitivity
            );
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!(
                "--threshold must be between 0.0 and 1.0, got {}",
                self.threshold
            );
        }
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            bail!(
                "--tick-ms must be between {MIN_TICK_MS} and {MAX_TICK_MS}, got {}",
                self.tick_ms
            );
        }
        if !(MIN_RUN_SECONDS..=MAX_RUN_SECONDS).contains(&self.seconds) {
            bail!(
                "--seconds must be between {MIN_RUN_SECONDS} and {MAX_RUN_SECONDS}, got {}",
                self.seconds
            );
        }
        if let Some(device) = &self.input_device {
            if device.trim().is_empty() {
                bail!("--input-device must not be empty");
            }
        }
        Ok(())
    }

    /// Snapshot the CLI-controlled detector settings for the session. The
    /// peak constants stay internal; only the loudness knobs are user-facing.
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            sensitivity: self.sensitivity,
            threshold: self.threshold,
            ..DetectorConfig::default()
        }
    }
}
