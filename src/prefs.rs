//! Persisted user preferences, injected behind a key-value store trait so the
//! monitor core never touches the filesystem.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Preference key holding the name of the chosen input device.
pub const SELECTED_MICROPHONE_KEY: &str = "SelectedMicrophone";

/// Key-value preference store contract.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// JSON-file-backed store. The file is created lazily on the first write and
/// rewritten whole on every change; the map stays small enough that this is
/// simpler than anything incremental.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Load the store, treating a missing file as empty. A present-but-corrupt
    /// file is an error rather than silently discarded preferences.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).with_context(|| {
                format!("failed to parse preference file '{}'", path.display())
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read preference file '{}'", path.display())
                })
            }
        };
        Ok(Self { path, values })
    }

    /// Platform preference location (e.g. `~/.config/screamwatch/prefs.json`).
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "screamwatch")
            .context("could not determine a config directory for preferences")?;
        Ok(dirs.config_dir().join("prefs.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create preference directory '{}'", parent.display())
            })?;
        }
        let contents =
            serde_json::to_string_pretty(&self.values).context("failed to encode preferences")?;
        fs::write(&self.path, contents).with_context(|| {
            format!("failed to write preference file '{}'", self.path.display())
        })
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }
}

/// Decide which input device a session should open.
///
/// Precedence: an explicit CLI choice wins; otherwise a saved preference is
/// honored only while that device is still present (a stale preference falls
/// through rather than failing); otherwise `None` selects the host default.
pub fn resolve_input_device(
    cli_choice: Option<&str>,
    store: &dyn PreferenceStore,
    devices: &[String],
) -> Option<String> {
    if let Some(name) = cli_choice {
        return Some(name.to_string());
    }
    store
        .get(SELECTED_MICROPHONE_KEY)
        .filter(|saved| devices.iter().any(|device| device == saved))
}
