pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
mod logging;
pub mod monitor;
pub mod prefs;

pub use logging::{init_logging, log_debug, log_file_path};
pub use monitor::{MonitorEvent, MonitorMetrics, Session};
