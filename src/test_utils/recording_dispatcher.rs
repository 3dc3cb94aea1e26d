use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    dispatcher::ActionDispatcher,
    error::DispatchError,
    types::{ActionRecord, DomainEvent},
};

/// [`ActionDispatcher`] that keeps every record it accepted. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    records: Arc<Mutex<Vec<ActionRecord>>>,
    calls: Arc<AtomicUsize>,
    fail_on_call: Option<usize>,
}

impl RecordingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n`-th call (1-based) fails; every other call succeeds.
    #[must_use]
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    #[must_use]
    pub fn records(&self) -> Vec<ActionRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Log indices of the accepted records, in dispatch order.
    #[must_use]
    pub fn log_indices(&self) -> Vec<u64> {
        self.records().iter().map(|r| r.source_log_index).collect()
    }

    /// Calls made so far, including failed ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&self, event: &DomainEvent) -> Result<ActionRecord, DispatchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(DispatchError(format!("destination rejected {}", event.id)));
        }
        let record = ActionRecord::from(event);
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }
}
