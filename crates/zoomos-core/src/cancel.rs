//! Cooperative cancellation of running files.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use zoomos_model::FileId;

/// Shared flag a chain polls between stages.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation flags keyed by file id.
///
/// The lifecycle tracker raises a flag; the orchestrator hands the same flag
/// to the chain running that file.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    flags: Mutex<HashMap<FileId, CancellationFlag>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag for `id`, created on first use.
    pub fn flag(&self, id: FileId) -> CancellationFlag {
        let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        flags.entry(id).or_default().clone()
    }

    pub fn cancel(&self, id: FileId) {
        self.flag(id).cancel();
    }

    pub fn is_cancelled(&self, id: FileId) -> bool {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        flags.get(&id).is_some_and(CancellationFlag::is_cancelled)
    }

    /// Number of files that currently hold a flag.
    pub fn len(&self) -> usize {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the flag once the file has reached a terminal status.
    pub fn clear(&self, id: FileId) {
        let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        flags.remove(&id);
    }
}
