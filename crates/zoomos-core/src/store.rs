//! Storage seam for file records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use zoomos_model::{FileId, FileRecord};

use crate::error::StoreError;

pub trait FileStore: Send + Sync {
    /// Reserve an id for a new record.
    fn allocate_id(&self) -> Result<FileId, StoreError>;

    /// Insert or replace a record. On error the stored record is unchanged.
    fn save(&self, record: &FileRecord) -> Result<(), StoreError>;

    fn find_by_id(&self, id: FileId) -> Result<Option<FileRecord>, StoreError>;
}

/// Process-local store, used by the CLI and in tests.
#[derive(Debug)]
pub struct InMemoryFileStore {
    records: Mutex<HashMap<FileId, FileRecord>>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
}

impl Default for InMemoryFileStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail, simulating a storage outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All records ordered by id.
    pub fn records(&self) -> Vec<FileRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<FileRecord> = records.values().cloned().collect();
        all.sort_by_key(|record| record.id);
        all
    }
}

impl FileStore for InMemoryFileStore {
    fn allocate_id(&self) -> Result<FileId, StoreError> {
        Ok(FileId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn save(&self, record: &FileRecord) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".to_string()));
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.id, record.clone());
        Ok(())
    }

    fn find_by_id(&self, id: FileId) -> Result<Option<FileRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(&id).cloned())
    }
}
