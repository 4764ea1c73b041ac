//! Persistent activity history: commands typed, errors shown and reminders
//! delivered, in arrival order.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    persist::{BlobStore, PersistError, PersistResult},
    runtime::{dispatcher::NotificationSink, events::Notification},
    types::zone,
};

/// One history line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Text recorded.
    pub message: String,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}",
            self.timestamp.with_timezone(&zone()).format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

/// Append-only entry list saved whole after every append.
pub struct ActivityLog {
    entries: Vec<LogEntry>,
    store: Box<dyn BlobStore>,
}

/// History shared between the control thread and the notification consumer.
pub type SharedActivityLog = Arc<Mutex<ActivityLog>>;

impl ActivityLog {
    /// Loads prior entries from `store`; an empty document means no history.
    pub fn open(store: Box<dyn BlobStore>) -> PersistResult<Self> {
        let data = store.load()?;
        let entries = if data.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(&data)?
        };
        Ok(Self { entries, store })
    }

    /// Wraps the log for sharing.
    pub fn shared(self) -> SharedActivityLog {
        Arc::new(Mutex::new(self))
    }

    /// Appends one entry and persists the whole log.
    ///
    /// The entry is kept in memory even when persisting fails.
    pub fn record(&mut self, message: impl Into<String>, timestamp: DateTime<Utc>) -> PersistResult<()> {
        self.entries.push(LogEntry {
            message: message.into(),
            timestamp,
        });
        self.save()
    }

    /// Persists the whole log.
    pub fn save(&mut self) -> PersistResult<()> {
        let data = serde_json::to_vec(&self.entries)?;
        self.store.save(&data)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Records every delivered notification into the shared history.
pub struct HistorySink {
    log: SharedActivityLog,
}

impl HistorySink {
    /// Sink writing into `log`.
    pub fn new(log: SharedActivityLog) -> Self {
        Self { log }
    }
}

impl NotificationSink for HistorySink {
    fn deliver(&mut self, notification: &Notification) -> Result<(), PersistError> {
        self.log.lock().record(notification.message.clone(), Utc::now())
    }
}
