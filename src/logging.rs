use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tracing_subscriber::fmt::time::UtcTime;

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
const TRACE_MAX_BYTES: u64 = 20 * 1024 * 1024;
static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_STATE: OnceLock<Mutex<LogState>> = OnceLock::new();
static TRACE_INIT: OnceLock<()> = OnceLock::new();

/// Path to the temp log file we rotate between runs.
pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("screamwatch.log")
}

/// Path to the structured trace log (JSON lines), overridable for tests and
/// log-shipping setups.
pub fn trace_file_path() -> PathBuf {
    env::var("SCREAMWATCH_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("screamwatch_trace.jsonl"))
}

struct LogWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl LogWriter {
    fn new(path: PathBuf, max_bytes: u64) -> Option<Self> {
        let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(&path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            max_bytes,
            bytes_written,
        })
    }

    fn rotate_if_needed(&mut self, next_len: usize) {
        if self.bytes_written.saturating_add(next_len as u64) <= self.max_bytes {
            return;
        }
        if let Ok(file) = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            self.file = file;
            self.bytes_written = 0;
        }
    }

    fn write_line(&mut self, line: &str) {
        self.rotate_if_needed(line.len());
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.bytes_written = self.bytes_written.saturating_add(line.len() as u64);
        }
    }
}

#[derive(Default)]
struct LogState {
    writer: Option<LogWriter>,
}

fn log_state() -> &'static Mutex<LogState> {
    LOG_STATE.get_or_init(|| Mutex::new(LogState::default()))
}

/// Configure logging based on CLI flags or environment. Also installs the
/// structured trace subscriber; `--log-timings` opens it up to TRACE so the
/// monitor loop's per-tick timing events get recorded.
pub fn init_logging(config: &AppConfig) {
    let enabled = (config.logs || config.log_timings) && !config.no_logs;
    LOG_ENABLED.store(enabled, Ordering::Relaxed);

    {
        let mut state = log_state()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if enabled {
            state.writer = LogWriter::new(log_file_path(), LOG_MAX_BYTES);
        } else {
            state.writer = None;
        }
    }

    if enabled {
        init_trace_log(config.log_timings);
    }
}

fn init_trace_log(verbose: bool) {
    let _ = TRACE_INIT.get_or_init(|| {
        let path = trace_file_path();
        // Same rotation policy as the debug log: an oversized file from a
        // previous run is discarded rather than appended to forever.
        if fs::metadata(&path).map(|m| m.len()).unwrap_or(0) > TRACE_MAX_BYTES {
            let _ = fs::remove_file(&path);
        }
        let file = match fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let max_level = if verbose {
            tracing::Level::TRACE
        } else {
            tracing::Level::INFO
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_max_level(max_level)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Write debug messages to a temp file so the hot path never blocks on stdout.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let line = format!("[{timestamp}] {msg}\n");
    let mut state = log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(writer) = state.writer.as_mut() {
        writer.write_line(&line);
    }
}
