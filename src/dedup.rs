use std::collections::HashSet;

use crate::types::EventId;

/// Session-scoped record of dispatched event ids.
///
/// Only grows. An id is recorded after its dispatch succeeded, so a failed dispatch leaves the
/// event eligible on the next pass. Nothing survives a restart: events in a chunk that was not
/// committed before a crash are dispatched again.
#[derive(Debug, Default)]
pub struct Deduplicator {
    processed: HashSet<EventId>,
}

impl Deduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` iff `id` has not been dispatched in this session.
    #[must_use]
    pub fn should_process(&self, id: &EventId) -> bool {
        !self.processed.contains(id)
    }

    /// Records `id` as dispatched. Idempotent.
    pub fn mark_processed(&mut self, id: EventId) {
        self.processed.insert(id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
