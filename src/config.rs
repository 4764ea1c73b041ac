//! Process configuration with environment overrides.

use std::path::PathBuf;

use crate::{
    calendar::CalendarConfig,
    persist::{BlobStore, PersistResult, json_file::JsonFileStore, sqlite::SqliteBlobStore},
};

/// Where documents are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// One JSON file per document.
    Json,
    /// One SQLite database holding both documents.
    Sqlite,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Settings for the `evcal` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Calendar document file (JSON backend).
    pub data_path: PathBuf,
    /// History document file (JSON backend).
    pub history_path: PathBuf,
    /// Selected backend.
    pub backend: StorageBackend,
    /// Database file (SQLite backend).
    pub sqlite_path: PathBuf,
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
    /// Re-arm unsent reminders on startup.
    pub rearm_on_load: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("calendar_data.json"),
            history_path: PathBuf::from("log_data.json"),
            backend: StorageBackend::Json,
            sqlite_path: PathBuf::from("calendar.db"),
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            rearm_on_load: true,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `EVCAL_*` variables. Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("EVCAL_DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("EVCAL_HISTORY_PATH") {
            config.history_path = PathBuf::from(path);
        }
        if let Some(backend) = lookup("EVCAL_BACKEND").and_then(|v| StorageBackend::parse(&v)) {
            config.backend = backend;
        }
        if let Some(path) = lookup("EVCAL_SQLITE_PATH") {
            config.sqlite_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("EVCAL_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("EVCAL_LOG_LEVEL") {
            let level = level.trim().to_ascii_lowercase();
            if !level.is_empty() {
                config.log_level = level;
            }
        }
        if let Some(rearm) = lookup("EVCAL_REARM") {
            match rearm.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.rearm_on_load = true,
                "0" | "false" | "no" | "off" => config.rearm_on_load = false,
                _ => {}
            }
        }
        config
    }

    /// Calendar settings derived from this configuration.
    pub fn calendar(&self) -> CalendarConfig {
        CalendarConfig {
            rearm_on_load: self.rearm_on_load,
        }
    }

    /// Opens the calendar and history stores for the selected backend.
    pub fn open_stores(&self) -> PersistResult<(Box<dyn BlobStore>, Box<dyn BlobStore>)> {
        Ok(match self.backend {
            StorageBackend::Json => (
                Box::new(JsonFileStore::new(&self.data_path)),
                Box::new(JsonFileStore::new(&self.history_path)),
            ),
            StorageBackend::Sqlite => (
                Box::new(SqliteBlobStore::open(&self.sqlite_path, "calendar")?),
                Box::new(SqliteBlobStore::open(&self.sqlite_path, "history")?),
            ),
        })
    }
}
