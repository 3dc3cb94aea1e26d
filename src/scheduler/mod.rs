//! The polling loop that turns source-chain deposits into destination-chain actions.
//!
//! Each poll cycle reads the chain tip, then walks `[last_processed_block + 1, tip]` in chunks of
//! at most `max_chunk_size` blocks. A chunk is the unit of atomicity: its events are decoded,
//! filtered, de-duplicated and dispatched in `(block_number, log_index)` order, and only once every
//! dispatch succeeded is `last_processed_block` persisted as the chunk's upper bound. Any failure
//! inside a chunk leaves the durable state untouched and the chunk is retried on a later poll.
//!
//! Delivery is at-least-once across restarts: the de-duplication set lives in memory only, so a
//! crash between dispatch and persist re-dispatches that chunk's events.
//!
//! ```text
//! Initializing -> Polling -> Scanning(chunk) -> ... -> Idle -> Polling -> ...
//!                                                        \
//!                                     cancellation -> ShuttingDown -> Stopped
//! ```

mod builder;
mod fetch;
pub mod range_iterator;

use std::fmt;

use alloy::primitives::{B256, U256};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use builder::ScanSchedulerBuilder;
pub use range_iterator::ChunkIterator;

use crate::{
    config::{ListenerConfig, MalformedPolicy},
    decoder::EventDecoder,
    dedup::Deduplicator,
    dispatcher::ActionDispatcher,
    error::{DecodeError, DispatchError, LedgerError, ListenerError, StateStoreError},
    ledger::LedgerReader,
    state_store::StateStore,
    types::{BlockHeight, Chunk, ScanState},
};

/// Where the scheduler currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Initializing,
    Polling,
    Scanning(Chunk),
    Idle,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Initializing => f.write_str("initializing"),
            SchedulerState::Polling => f.write_str("polling"),
            SchedulerState::Scanning(chunk) => write!(f, "scanning {chunk}"),
            SchedulerState::Idle => f.write_str("idle"),
            SchedulerState::ShuttingDown => f.write_str("shutting down"),
            SchedulerState::Stopped => f.write_str("stopped"),
        }
    }
}

/// Why a poll cycle gave up. The affected chunk is retried on the next poll.
#[derive(Error, Debug, Clone)]
pub enum AbortReason {
    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Dispatch(DispatchError),

    #[error("Malformed event: {0}")]
    MalformedEvent(DecodeError),

    #[error("Scan state not persisted: {0}")]
    StateWrite(StateStoreError),
}

/// Result of one [`ScanScheduler::poll_once`] call.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Nothing new since the last committed block.
    UpToDate { latest: BlockHeight },
    /// Every chunk in `[from, to]` was committed.
    Advanced { from: BlockHeight, to: BlockHeight, dispatched: usize, skipped_malformed: usize },
    /// The cycle stopped early. Chunks committed before the failure stay committed.
    Aborted { reason: AbortReason },
    /// Shutdown was requested before the cycle finished.
    Cancelled,
}

#[derive(Debug, Default)]
struct ChunkTally {
    dispatched: usize,
    skipped_malformed: usize,
}

enum ChunkFailure {
    Aborted(AbortReason),
    RangeTooLarge,
    Cancelled,
    Fatal(ListenerError),
}

/// Drives the scan loop. Built with [`ScanSchedulerBuilder`].
///
/// The scheduler is the only owner of the in-memory [`ScanState`] and of the de-duplication set;
/// all dispatches happen sequentially on the task that runs it.
#[derive(Debug)]
pub struct ScanScheduler<L, D, S, A> {
    reader: L,
    decoder: D,
    store: S,
    dispatcher: A,
    config: ListenerConfig,
    topic: B256,
    destination_chain_id: Option<U256>,
    state: SchedulerState,
    initialized: bool,
    committed: Option<ScanState>,
    /// First block not yet committed. `None` until resolved from the store, `start_block` or the
    /// chain tip.
    cursor: Option<BlockHeight>,
    pending_commit: Option<ScanState>,
    dedup: Deduplicator,
}

impl<L, D, S, A> ScanScheduler<L, D, S, A>
where
    L: LedgerReader,
    D: EventDecoder,
    S: StateStore,
    A: ActionDispatcher,
{
    fn new(reader: L, decoder: D, store: S, dispatcher: A, config: ListenerConfig) -> Self {
        let topic = decoder.signature();
        let destination_chain_id = config.destination_chain_id.map(U256::from);
        Self {
            reader,
            decoder,
            store,
            dispatcher,
            config,
            topic,
            destination_chain_id,
            state: SchedulerState::Initializing,
            initialized: false,
            committed: None,
            cursor: None,
            pending_commit: None,
            dedup: Deduplicator::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// The last block whose chunk was durably committed.
    #[must_use]
    pub fn last_processed_block(&self) -> Option<BlockHeight> {
        self.committed.map(|state| state.last_processed_block)
    }

    /// Upper bound of a fully dispatched chunk whose state write has not succeeded yet.
    #[must_use]
    pub fn pending_commit(&self) -> Option<BlockHeight> {
        self.pending_commit.map(|state| state.last_processed_block)
    }

    /// Loads the persisted scan state.
    ///
    /// A corrupted record is fatal. A record that cannot be read at all is treated like a
    /// missing one. Without a record, scanning starts at `start_block` when configured and
    /// otherwise at the chain tip observed by the first poll.
    ///
    /// # Errors
    ///
    /// [`ListenerError::CorruptedState`] when the state record exists but cannot be parsed.
    pub async fn initialize(&mut self) -> Result<(), ListenerError> {
        self.transition(SchedulerState::Initializing);

        match self.store.load().await {
            Ok(Some(state)) => {
                info!(
                    last_processed_block = state.last_processed_block,
                    "Resuming from persisted scan state"
                );
                self.committed = Some(state);
                self.cursor = Some(state.next_block());
            }
            Ok(None) => {
                info!(start_block = ?self.config.start_block, "No persisted scan state");
                self.cursor = self.config.start_block;
            }
            Err(e @ StateStoreError::Corrupted { .. }) => {
                error!(error = %e, "Refusing to start from corrupted scan state");
                return Err(ListenerError::CorruptedState(e));
            }
            Err(e) => {
                warn!(error = %e, "Scan state unreadable, starting as if none was persisted");
                self.cursor = self.config.start_block;
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Runs one poll cycle: catches up from the cursor to the current chain tip.
    ///
    /// Connectivity, dispatch and state-write failures end the cycle with
    /// [`CycleOutcome::Aborted`]; the caller simply polls again later. Every outcome but
    /// [`CycleOutcome::Cancelled`] leaves the scheduler [`SchedulerState::Idle`].
    ///
    /// # Errors
    ///
    /// * [`ListenerError::CorruptedState`] if this call had to initialize the scheduler and the
    ///   state record is corrupted.
    /// * [`ListenerError::RangeTooLargeAtMinimum`] if the endpoint rejects a single-block query.
    /// * [`ListenerError::Ledger`] if the reader fails a chunk with a non-transient error.
    pub async fn poll_once(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<CycleOutcome, ListenerError> {
        let outcome = self.poll_cycle(shutdown).await?;
        if !matches!(outcome, CycleOutcome::Cancelled) {
            self.transition(SchedulerState::Idle);
        }
        Ok(outcome)
    }

    async fn poll_cycle(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<CycleOutcome, ListenerError> {
        if !self.initialized {
            self.initialize().await?;
        }
        self.transition(SchedulerState::Polling);

        if let Err(e) = self.flush_pending_commit().await {
            return Ok(CycleOutcome::Aborted { reason: AbortReason::StateWrite(e) });
        }

        let latest = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(CycleOutcome::Cancelled),
            result = self.reader.latest_height() => match result {
                Ok(latest) => latest,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch latest block height");
                    return Ok(CycleOutcome::Aborted { reason: AbortReason::Ledger(e) });
                }
            },
        };

        let first = match self.cursor {
            Some(next) => next,
            None => {
                info!(latest_block = latest, "Starting at the chain tip");
                self.cursor = Some(latest);
                latest
            }
        };
        if first > latest {
            debug!(next_block = first, latest_block = latest, "Up to date");
            return Ok(CycleOutcome::UpToDate { latest });
        }

        let mut chunk_size = self.config.max_chunk_size;
        let mut dispatched = 0;
        let mut skipped_malformed = 0;

        while let Some(chunk) =
            self.cursor.and_then(|next| range_iterator::next_chunk(next, latest, chunk_size))
        {
            if shutdown.is_cancelled() {
                return Ok(CycleOutcome::Cancelled);
            }
            self.transition(SchedulerState::Scanning(chunk));

            match self.process_chunk(chunk, shutdown).await {
                Ok(tally) => {
                    dispatched += tally.dispatched;
                    skipped_malformed += tally.skipped_malformed;
                }
                Err(ChunkFailure::RangeTooLarge) => {
                    if chunk.len() == 1 {
                        error!(block = chunk.from, "Endpoint rejects single-block log queries");
                        return Err(ListenerError::RangeTooLargeAtMinimum { block: chunk.from });
                    }
                    chunk_size = (chunk.len() / 2).max(1);
                    warn!(
                        chunk = %chunk,
                        chunk_size = chunk_size,
                        "Block range rejected as too large, shrinking chunk"
                    );
                }
                Err(ChunkFailure::Cancelled) => return Ok(CycleOutcome::Cancelled),
                Err(ChunkFailure::Fatal(e)) => return Err(e),
                Err(ChunkFailure::Aborted(reason)) => {
                    warn!(chunk = %chunk, reason = %reason, "Chunk aborted, retrying next poll");
                    return Ok(CycleOutcome::Aborted { reason });
                }
            }
        }

        Ok(CycleOutcome::Advanced { from: first, to: latest, dispatched, skipped_malformed })
    }

    /// Polls until `shutdown` is cancelled or a fatal error occurs.
    ///
    /// Cancellation is observed while idle, while waiting on the ledger and between chunks, but
    /// never between the dispatches of one chunk. Before returning, a pending commit is flushed
    /// one last time and the scheduler ends in [`SchedulerState::Stopped`].
    ///
    /// # Errors
    ///
    /// See [`ScanScheduler::initialize`] and [`ScanScheduler::poll_once`].
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), ListenerError> {
        let result = self.poll_until_cancelled(&shutdown).await;
        if let Err(e) = &result {
            error!(error = %e, "Scanner failed");
        }
        self.shut_down().await;
        result
    }

    async fn poll_until_cancelled(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<(), ListenerError> {
        if !self.initialized {
            self.initialize().await?;
        }

        loop {
            match self.poll_once(shutdown).await? {
                CycleOutcome::Cancelled => return Ok(()),
                outcome => debug!(outcome = ?outcome, "Poll cycle finished"),
            }

            tokio::select! {
                biased;
                () = shutdown.cancelled() => return Ok(()),
                () = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    async fn shut_down(&mut self) {
        self.transition(SchedulerState::ShuttingDown);
        if self.flush_pending_commit().await.is_err() {
            error!(
                pending_commit = ?self.pending_commit(),
                "Stopping with an unpersisted commit, its chunk will be rescanned"
            );
        }
        self.transition(SchedulerState::Stopped);
        info!(last_processed_block = ?self.last_processed_block(), "Scanner stopped");
    }

    async fn process_chunk(
        &mut self,
        chunk: Chunk,
        shutdown: &CancellationToken,
    ) -> Result<ChunkTally, ChunkFailure> {
        let fetched = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(ChunkFailure::Cancelled),
            result = fetch::fetch_chunk_logs(
                &self.reader,
                self.config.contract_address,
                self.topic,
                chunk,
                self.config.fetch_span(),
                self.config.max_concurrent_fetches,
            ) => result,
        };
        let logs = match fetched {
            Ok(logs) => logs,
            Err(LedgerError::RangeTooLarge { .. }) => return Err(ChunkFailure::RangeTooLarge),
            Err(e) if e.is_transient() => {
                return Err(ChunkFailure::Aborted(AbortReason::Ledger(e)));
            }
            Err(e) => {
                error!(chunk = %chunk, error = %e, "Reader rejected the chunk");
                return Err(ChunkFailure::Fatal(e.into()));
            }
        };

        // no cancellation point from here on; a chunk is dispatched and committed as a whole
        let mut tally = ChunkTally::default();
        for log in &logs {
            let event = match self.decoder.decode(log) {
                Ok(event) => event,
                Err(e) if self.config.malformed_policy == MalformedPolicy::Skip => {
                    warn!(
                        block = ?log.block_number,
                        log_index = ?log.log_index,
                        tx_hash = ?log.transaction_hash,
                        error = %e,
                        "Skipping malformed event"
                    );
                    tally.skipped_malformed += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        block = ?log.block_number,
                        log_index = ?log.log_index,
                        error = %e,
                        "Malformed event, abandoning chunk"
                    );
                    return Err(ChunkFailure::Aborted(AbortReason::MalformedEvent(e)));
                }
            };

            if self.destination_chain_id.is_some_and(|chain| chain != event.destination_chain_id) {
                debug!(
                    event = %event.id,
                    destination_chain = %event.destination_chain_id,
                    "Ignoring event for another destination chain"
                );
                continue;
            }

            if !self.dedup.should_process(&event.id) {
                debug!(event = %event.id, "Event already dispatched");
                continue;
            }

            match self.dispatcher.dispatch(&event) {
                Ok(record) => {
                    debug!(
                        event = %event.id,
                        block = event.block_number,
                        recipient = %record.recipient,
                        "Event dispatched"
                    );
                    self.dedup.mark_processed(event.id);
                    tally.dispatched += 1;
                }
                Err(e) => {
                    error!(event = %event.id, error = %e, "Dispatch failed, abandoning chunk");
                    return Err(ChunkFailure::Aborted(AbortReason::Dispatch(e)));
                }
            }
        }

        self.commit(chunk)
            .await
            .map_err(|e| ChunkFailure::Aborted(AbortReason::StateWrite(e)))?;
        Ok(tally)
    }

    async fn commit(&mut self, chunk: Chunk) -> Result<(), StateStoreError> {
        let state = ScanState::new(chunk.to);
        if let Err(e) = self.store.persist(&state).await {
            error!(chunk = %chunk, error = %e, "Failed to persist scan state, keeping commit pending");
            self.pending_commit = Some(state);
            return Err(e);
        }

        self.advance(state);
        info!(chunk = %chunk, "Chunk committed");
        Ok(())
    }

    async fn flush_pending_commit(&mut self) -> Result<(), StateStoreError> {
        let Some(state) = self.pending_commit else {
            return Ok(());
        };

        match self.store.persist(&state).await {
            Ok(()) => {
                self.pending_commit = None;
                self.advance(state);
                info!(
                    last_processed_block = state.last_processed_block,
                    "Pending commit persisted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    last_processed_block = state.last_processed_block,
                    error = %e,
                    "Pending commit still not persisted"
                );
                Err(e)
            }
        }
    }

    fn advance(&mut self, state: ScanState) {
        self.committed = Some(state);
        self.cursor = Some(state.next_block());
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Scheduler state changed");
        }
        self.state = next;
    }
}
