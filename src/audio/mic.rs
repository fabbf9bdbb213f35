//! System microphone capture via CPAL.
//!
//! Handles device enumeration and format conversion. The input stream runs for
//! the lifetime of the source; dropping the source releases the stream, so a
//! device can never be captured by two sessions at once.

use super::dispatch::write_into_ring;
use super::ring::SampleRing;
use super::{SampleSource, RING_SECONDS};
use crate::error::MonitorError;
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Live microphone input feeding the shared sample ring.
pub struct MicSource {
    _stream: cpal::Stream,
    ring: Arc<Mutex<SampleRing>>,
    active: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    window_len: usize,
    device_name: String,
}

impl MicSource {
    /// List microphone names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Open an input stream on the preferred device (or the host default) and
    /// start capturing into a one-second ring.
    ///
    /// A named device that is not present surfaces as `DeviceUnavailable` so
    /// the caller can send the user back to device selection.
    pub fn open(preferred: Option<&str>, window_len: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| MonitorError::DeviceUnavailable(name.to_string()))?
            }
            None => host.default_input_device().ok_or_else(|| {
                MonitorError::DeviceUnavailable(format!(
                    "no default input device. {}",
                    mic_permission_hint()
                ))
            })?,
        };
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());

        let default_config = device
            .default_input_config()
            .with_context(|| format!("failed to query input config for '{device_name}'"))?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        log_debug(&format!(
            "MicSource config: device={device_name} format={format:?} sample_rate={sample_rate}Hz channels={channels}"
        ));

        let ring = Arc::new(Mutex::new(SampleRing::new(
            (sample_rate * RING_SECONDS) as usize,
        )));
        let active = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicUsize::new(0));

        // A stream error ends the capture as far as the tick loop is
        // concerned; analysis must not keep running on a stale ring.
        let err_active = active.clone();
        let err_fn = move |err| {
            log_debug(&format!("audio_stream_error: {err}"));
            err_active.store(false, Ordering::Relaxed);
        };

        let stream = match format {
            SampleFormat::F32 => {
                let ring = ring.clone();
                let dropped = dropped.clone();
                let mut scratch = Vec::new();
                device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        write_into_ring(&ring, &mut scratch, data, channels, |sample| sample, &dropped);
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let ring = ring.clone();
                let dropped = dropped.clone();
                let mut scratch = Vec::new();
                device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        write_into_ring(
                            &ring,
                            &mut scratch,
                            data,
                            channels,
                            |sample| sample as f32 / 32_768.0_f32,
                            &dropped,
                        );
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let ring = ring.clone();
                let dropped = dropped.clone();
                let mut scratch = Vec::new();
                device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        write_into_ring(
                            &ring,
                            &mut scratch,
                            data,
                            channels,
                            |sample| (sample as f32 - 32_768.0_f32) / 32_768.0_f32,
                            &dropped,
                        );
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play()?;
        active.store(true, Ordering::Relaxed);

        Ok(Self {
            _stream: stream,
            ring,
            active,
            dropped,
            window_len,
            device_name,
        })
    }

    /// Name of the active capture device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Callback batches discarded because the ring was busy.
    pub fn dropped_batches(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SampleSource for MicSource {
    fn is_capturing(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn fetch_window(&mut self, window: &mut [f32]) -> Result<(), MonitorError> {
        if !self.is_capturing() {
            return Err(MonitorError::CaptureNotActive);
        }
        if window.len() != self.window_len {
            return Err(MonitorError::InvalidInput(format!(
                "expected a {}-sample window, got {}",
                self.window_len,
                window.len()
            )));
        }
        let ring = self
            .ring
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ring.copy_latest(window);
        Ok(())
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
