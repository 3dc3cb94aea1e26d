//! Bridge-Listener watches a source EVM chain for `DepositInitiated` events and hands each one to
//! a dispatcher that performs the matching mint/unlock on a destination chain.
//!
//! The main entry point is [`ScanScheduler`], built via [`ScanSchedulerBuilder`] from four
//! capabilities:
//!
//! - a [`LedgerReader`] for the chain tip and log queries ([`ledger::RobustProvider`] over RPC),
//! - an [`EventDecoder`] turning raw logs into [`DomainEvent`]s ([`DepositDecoder`]),
//! - a [`StateStore`] holding the high-water-mark ([`FileStateStore`]),
//! - an [`ActionDispatcher`] acting on each event ([`LoggingDispatcher`]).
//!
//! # Crash recovery
//!
//! Block ranges are scanned in chunks. The persisted [`ScanState`] only advances once every event
//! of a chunk has been dispatched, so a restart resumes at the first uncommitted block. Delivery is
//! at-least-once: events of a chunk interrupted between dispatch and commit are dispatched again
//! after a restart. Within one session an event is never dispatched twice.
//!
//! # Reorgs
//!
//! Chain reorganizations are not detected. Point the listener at an endpoint whose tip is final
//! enough for your use, or run it behind a confirmation depth.
//!
//! # Shutdown
//!
//! [`ScanScheduler::run`] stops when its [`CancellationToken`](tokio_util::sync::CancellationToken)
//! is cancelled. A chunk whose dispatches already started is always finished and committed first.

#[macro_use]
mod logging;

pub mod config;
pub mod decoder;
pub mod dedup;
pub mod dispatcher;
pub mod ledger;
pub mod scheduler;
pub mod state_store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;
mod types;

pub use config::{
    DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_POLL_INTERVAL, ListenerConfig,
    MalformedPolicy,
};
pub use decoder::{DepositDecoder, DepositInitiated, EventDecoder};
pub use dedup::Deduplicator;
pub use dispatcher::{ActionDispatcher, LoggingDispatcher};
pub use error::{DecodeError, DispatchError, LedgerError, ListenerError, StateStoreError};
pub use ledger::{LedgerReader, RawLogEntry};
pub use scheduler::{
    AbortReason, ChunkIterator, CycleOutcome, ScanScheduler, ScanSchedulerBuilder, SchedulerState,
};
pub use state_store::{DEFAULT_STATE_PATH, FileStateStore, StateStore};
pub use types::{ActionRecord, BlockHeight, Chunk, DomainEvent, EventId, ScanState};
