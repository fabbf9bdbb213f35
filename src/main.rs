//! screamwatch entrypoint: resolve a microphone, run a monitor session for a
//! while, and print the live loudness plus threshold/peak events.

use anyhow::{bail, Context, Result};
use crossbeam_channel::RecvTimeoutError;
use screamwatch::audio::{MicSource, SAMPLE_WINDOW_LEN};
use screamwatch::config::defaults::METER_REDRAW_MS;
use screamwatch::config::AppConfig;
use screamwatch::prefs::{
    resolve_input_device, JsonFileStore, PreferenceStore, SELECTED_MICROPHONE_KEY,
};
use screamwatch::monitor::session_timing_line;
use screamwatch::{init_logging, log_debug, log_file_path, MonitorEvent, Session};
use std::io::{self, Write};
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;

    if config.list_input_devices {
        return list_input_devices();
    }

    init_logging(&config);
    log_debug("=== screamwatch started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let devices = MicSource::list_devices().context("failed to list audio input devices")?;
    if devices.is_empty() {
        bail!("no audio input devices found; connect a microphone and retry");
    }
    if let Some(requested) = &config.input_device {
        if !devices.iter().any(|device| device == requested) {
            bail!("input device '{requested}' not found; available: {devices:?}");
        }
    }

    let prefs_path = match &config.prefs_path {
        Some(path) => path.clone(),
        None => JsonFileStore::default_path()?,
    };
    let mut store = JsonFileStore::open(&prefs_path)?;
    let selected = resolve_input_device(config.input_device.as_deref(), &store, &devices);
    if let Some(chosen) = &config.input_device {
        // Persist an explicit selection, like the original device dropdown did.
        if store.get(SELECTED_MICROPHONE_KEY).as_deref() != Some(chosen.as_str()) {
            store.set(SELECTED_MICROPHONE_KEY, chosen)?;
        }
    }

    match &selected {
        Some(name) => println!("Monitoring input device: {name}"),
        None => println!("Monitoring default input device"),
    }
    println!(
        "sensitivity={} threshold={} tick={}ms for {}s",
        config.sensitivity, config.threshold, config.tick_ms, config.seconds
    );

    let detector = config.detector_config();
    let tick = Duration::from_millis(config.tick_ms);
    let source_device = selected.clone();
    let session = Session::start(
        move || MicSource::open(source_device.as_deref(), SAMPLE_WINDOW_LEN),
        detector,
        SAMPLE_WINDOW_LEN,
        tick,
    );

    let session_started = Instant::now();
    let run_result = consume_events(&session, Duration::from_secs(config.seconds));
    let metrics = session.stop();
    if config.log_timings {
        log_debug(&session_timing_line(&metrics, session_started.elapsed()));
    }
    println!();
    run_result?;

    println!(
        "Session summary: {} ticks analysed, {} skipped, {} threshold events, {} peak events",
        metrics.ticks_analysed, metrics.ticks_skipped, metrics.threshold_events, metrics.peak_events
    );
    if let Ok(json) = serde_json::to_string(&metrics) {
        log_debug(&format!("metrics_json|{json}"));
    }
    log_debug("=== screamwatch exiting ===");
    Ok(())
}

fn list_input_devices() -> Result<()> {
    match MicSource::list_devices() {
        Ok(devices) if devices.is_empty() => println!("No audio input devices detected."),
        Ok(devices) => {
            println!("Detected audio input devices:");
            for name in devices {
                println!("  - {name}");
            }
        }
        Err(err) => println!("Failed to list audio input devices: {err:#}"),
    }
    Ok(())
}

/// Drain session events until the deadline, redrawing the meter in place and
/// printing edge events on their own lines.
fn consume_events(session: &Session, run_for: Duration) -> Result<()> {
    let deadline = Instant::now() + run_for;
    let redraw_interval = Duration::from_millis(METER_REDRAW_MS);
    let mut last_redraw = Instant::now() - redraw_interval;
    let mut stdout = io::stdout();

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        let wait = (deadline - now).min(Duration::from_millis(50));
        match session.events().recv_timeout(wait) {
            Ok(MonitorEvent::Level { loudness }) => {
                if last_redraw.elapsed() >= redraw_interval {
                    print!("\rVolume: {loudness:.2}");
                    stdout.flush().ok();
                    last_redraw = Instant::now();
                }
            }
            Ok(MonitorEvent::ThresholdCrossed { loudness }) => {
                println!("\nVolume threshold crossed! (loudness {loudness:.2})");
                log_debug(&format!("event|threshold_crossed|loudness={loudness:.3}"));
            }
            Ok(MonitorEvent::PeakDetected { peak }) => {
                println!("\nAudio peak detected! (peak {peak:.2})");
                log_debug(&format!("event|peak_detected|peak={peak:.3}"));
            }
            Ok(MonitorEvent::Failed(message)) => {
                bail!("capture failed: {message}");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}
