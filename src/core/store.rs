//! Atomic reads and writes of the registry, local configs, and the
//! discovery config
//!
//! Every write goes to a temp file in the target's directory, is flushed,
//! and then renamed over the target, so a crash mid-write never leaves a
//! partial file. Transient I/O errors are retried with exponential backoff
//! (100 ms base, x2 per attempt, small jitter, 3 attempts) before
//! surfacing as fatal.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::error::{Error, ParseError, PathError, Result};
use crate::core::record::{
    AppConfigFile, DiscoveryConfig, GlobalEntry, GlobalRegistryFile, LocalConfigFile,
    LocalProject, LOCAL_CONFIG_FILE,
};

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_millis(100);
const RETRY_JITTER_MS: u64 = 25;

/// Environment override for the config directory (hermetic tests)
pub const CONFIG_DIR_ENV: &str = "MDT_CONFIG_DIR";

/// File-level access to everything this tool persists
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Default store: `$MDT_CONFIG_DIR` if set, else the platform config
    /// directory for `mdt` (e.g. `~/.config/mdt` on Linux).
    pub fn open_default() -> Result<Self> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(Self::new(PathBuf::from(dir)));
        }
        let dirs =
            directories::ProjectDirs::from("", "", "mdt").ok_or(PathError::NoHome)?;
        Ok(Self::new(dirs.config_dir().to_path_buf()))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn registry_dir(&self) -> PathBuf {
        self.config_dir.join("projects")
    }

    pub fn registry_path(&self, id: &str) -> PathBuf {
        self.registry_dir().join(format!("{id}.toml"))
    }

    pub fn discovery_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn local_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(LOCAL_CONFIG_FILE)
    }

    // ---- discovery config ----

    /// Load the `[discovery]` table; a missing file yields the defaults.
    pub fn load_discovery_config(&self) -> Result<DiscoveryConfig> {
        let path = self.discovery_config_path();
        Ok(self
            .read_toml::<AppConfigFile>(&path)?
            .map(|file| file.discovery)
            .unwrap_or_default())
    }

    pub fn save_discovery_config(&self, discovery: &DiscoveryConfig) -> Result<()> {
        let file = AppConfigFile {
            discovery: discovery.clone(),
        };
        self.write_toml(&self.discovery_config_path(), &file)
    }

    // ---- global registry ----

    pub fn load_global_entry(&self, id: &str) -> Result<Option<GlobalEntry>> {
        let path = self.registry_path(id);
        Ok(self
            .read_toml::<GlobalRegistryFile>(&path)?
            .map(|file| GlobalEntry::classify(file.project)))
    }

    pub fn save_global_entry(&self, id: &str, entry: &GlobalEntry) -> Result<()> {
        let file = GlobalRegistryFile {
            project: entry.to_raw(),
        };
        self.write_toml(&self.registry_path(id), &file)
    }

    /// Returns whether an entry existed.
    pub fn remove_global_entry(&self, id: &str) -> Result<bool> {
        let path = self.registry_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// All registry entries by project id. Unparseable files are skipped
    /// with a warning so one bad entry cannot take down a listing.
    pub fn list_global_entries(&self) -> Result<Vec<(String, GlobalEntry)>> {
        let dir = self.registry_dir();
        let mut entries = Vec::new();

        let read_dir = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(Error::io(dir, e)),
        };

        for dir_entry in read_dir {
            let dir_entry = match dir_entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable registry entry");
                    continue;
                }
            };
            let path = dir_entry.path();
            if path.extension().map_or(true, |ext| ext != "toml") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(String::from)
            else {
                continue;
            };
            match self.read_toml::<GlobalRegistryFile>(&path) {
                Ok(Some(file)) => entries.push((id, GlobalEntry::classify(file.project))),
                Ok(None) => {}
                Err(e) => {
                    warn!(entry = %path.display(), error = %e, "skipping malformed registry entry");
                }
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    // ---- local configs ----

    pub fn load_local_config(&self, project_dir: &Path) -> Result<Option<LocalProject>> {
        let path = Self::local_config_path(project_dir);
        Ok(self
            .read_toml::<LocalConfigFile>(&path)?
            .map(|file| file.project))
    }

    pub fn save_local_config(&self, project_dir: &Path, local: &LocalProject) -> Result<()> {
        let file = LocalConfigFile {
            project: local.clone(),
        };
        self.write_toml(&Self::local_config_path(project_dir), &file)
    }

    /// Returns whether a local config existed.
    pub fn remove_local_config(&self, project_dir: &Path) -> Result<bool> {
        let path = Self::local_config_path(project_dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    // ---- plumbing ----

    fn read_toml<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let content = match with_retries(path, || fs::read_to_string(path)) {
            Ok(content) => content,
            Err(Error::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };
        let name = path.display().to_string();
        let value = toml::from_str(&content)
            .map_err(|e| ParseError::from_toml(&e, &content, &name))?;
        Ok(Some(value))
    }

    fn write_toml<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let content = toml::to_string_pretty(value).map_err(|e| {
            Error::io(
                path,
                std::io::Error::new(ErrorKind::InvalidData, e.to_string()),
            )
        })?;
        if let Some(parent) = path.parent() {
            with_retries(parent, || fs::create_dir_all(parent))?;
        }
        with_retries(path, || atomic_write(path, content.as_bytes()))?;
        debug!(file = %path.display(), "wrote config");
        Ok(())
    }
}

/// Modification timestamp used as a cheap version marker; `None` when the
/// file does not exist.
pub fn version_marker(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Write bytes via a same-directory temp file, flush, then rename.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    )
}

fn with_retries<T>(path: &Path, mut op: impl FnMut() -> std::io::Result<T>) -> Result<T> {
    let mut delay = RETRY_BASE;
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < RETRY_ATTEMPTS && is_transient(e.kind()) => {
                warn!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    "transient I/O error, retrying"
                );
                let jitter = Duration::from_millis(rand::random_range(0..RETRY_JITTER_MS));
                thread::sleep(delay + jitter);
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(Error::io(path, e)),
        }
    }
}
