use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;

use super::{BlobStore, PersistError, PersistResult};

#[derive(Debug, Default)]
struct Inner {
    data: Mutex<Vec<u8>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
    save_delay: Mutex<Option<Duration>>,
}

/// Document held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

/// Shared view of a [`MemoryStore`] that stays usable after the store is
/// moved into a calendar or history.
#[derive(Debug, Clone)]
pub struct MemoryStoreHandle {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `data`.
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        *store.inner.data.lock() = data.into();
        store
    }

    /// Inspection and fault-injection handle.
    pub fn handle(&self) -> MemoryStoreHandle {
        MemoryStoreHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MemoryStoreHandle {
    /// Current document bytes.
    pub fn data(&self) -> Vec<u8> {
        self.inner.data.lock().clone()
    }

    /// Replaces the document bytes directly.
    pub fn set_data(&self, data: impl Into<Vec<u8>>) {
        *self.inner.data.lock() = data.into();
    }

    /// Makes subsequent saves fail (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Sleeps this long inside every save.
    pub fn set_save_delay(&self, delay: Option<Duration>) {
        *self.inner.save_delay.lock() = delay;
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }
}

impl BlobStore for MemoryStore {
    fn save(&mut self, data: &[u8]) -> PersistResult<()> {
        let delay = *self.inner.save_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistError::Message("memory store: save rejected".to_string()));
        }
        *self.inner.data.lock() = data.to_vec();
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> PersistResult<Vec<u8>> {
        Ok(self.inner.data.lock().clone())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}
