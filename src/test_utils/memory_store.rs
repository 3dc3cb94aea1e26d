use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::{error::StateStoreError, state_store::StateStore, types::ScanState};

#[derive(Debug, Default)]
struct Inner {
    state: Option<ScanState>,
    corrupted: bool,
    unreadable: bool,
    persist_failures: usize,
    writes: Vec<ScanState>,
}

/// [`StateStore`] kept in memory. Clones share the same record, which stands in for the
/// file surviving a process restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_state(last_processed_block: u64) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().state = Some(ScanState::new(last_processed_block));
        store
    }

    /// `load` reports the record as corrupted.
    #[must_use]
    pub fn corrupted(self) -> Self {
        self.inner.lock().unwrap().corrupted = true;
        self
    }

    /// `load` fails with an I/O error.
    #[must_use]
    pub fn unreadable(self) -> Self {
        self.inner.lock().unwrap().unreadable = true;
        self
    }

    /// The next `n` `persist` calls fail without touching the record.
    pub fn fail_next_persists(&self, n: usize) {
        self.inner.lock().unwrap().persist_failures = n;
    }

    /// The durable record.
    #[must_use]
    pub fn current(&self) -> Option<ScanState> {
        self.inner.lock().unwrap().state
    }

    /// Every successful write, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<ScanState> {
        self.inner.lock().unwrap().writes.clone()
    }
}

impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<ScanState>, StateStoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.corrupted {
            return Err(StateStoreError::Corrupted {
                path: PathBuf::from("memory"),
                reason: "unparsable record".to_string(),
            });
        }
        if inner.unreadable {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "unreadable").into());
        }
        Ok(inner.state)
    }

    async fn persist(&self, state: &ScanState) -> Result<(), StateStoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.persist_failures > 0 {
            inner.persist_failures -= 1;
            return Err(io::Error::other("disk full").into());
        }
        inner.state = Some(*state);
        inner.writes.push(*state);
        Ok(())
    }
}
