use std::time::Duration;

use alloy::primitives::Address;

use crate::{
    config::{ListenerConfig, MalformedPolicy},
    decoder::EventDecoder,
    dispatcher::ActionDispatcher,
    error::ListenerError,
    ledger::LedgerReader,
    scheduler::ScanScheduler,
    state_store::StateStore,
    types::BlockHeight,
};

/// Builder/configuration for a [`ScanScheduler`].
#[derive(Clone, Debug, Default)]
pub struct ScanSchedulerBuilder {
    config: ListenerConfig,
}

impl ScanSchedulerBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded [`ListenerConfig`].
    #[must_use]
    pub fn from_config(config: ListenerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn contract_address(mut self, contract_address: Address) -> Self {
        self.config.contract_address = contract_address;
        self
    }

    /// Sets the human-readable signature of the scanned event.
    ///
    /// Its hash must equal the decoder's [`EventDecoder::signature`].
    #[must_use]
    pub fn event_signature(mut self, event_signature: impl Into<String>) -> Self {
        self.config.event_signature = event_signature.into();
        self
    }

    /// Only events addressed to this chain are dispatched.
    #[must_use]
    pub fn destination_chain_id(mut self, chain_id: u64) -> Self {
        self.config.destination_chain_id = Some(chain_id);
        self
    }

    /// Sets the maximum number of blocks per chunk.
    ///
    /// Must be greater than 0.
    #[must_use]
    pub fn max_chunk_size(mut self, max_chunk_size: u64) -> Self {
        self.config.max_chunk_size = max_chunk_size;
        self
    }

    /// Must be at least one millisecond.
    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets how many log requests for one chunk may be in flight at once.
    #[must_use]
    pub fn max_concurrent_fetches(mut self, max_concurrent_fetches: usize) -> Self {
        self.config.max_concurrent_fetches = max_concurrent_fetches;
        self
    }

    /// Caps the span of a single log request. Defaults to the chunk size.
    #[must_use]
    pub fn max_fetch_span(mut self, max_fetch_span: u64) -> Self {
        self.config.max_fetch_span = Some(max_fetch_span);
        self
    }

    /// First block to scan when the store holds no state.
    #[must_use]
    pub fn start_block(mut self, start_block: BlockHeight) -> Self {
        self.config.start_block = Some(start_block);
        self
    }

    #[must_use]
    pub fn malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.config.malformed_policy = policy;
        self
    }

    /// Validates the configuration and assembles the scheduler.
    ///
    /// # Errors
    ///
    /// Any [`ListenerConfig::validate`] failure, or
    /// [`ListenerError::InvalidEventSignature`] if the configured signature does not hash to the
    /// decoder's topic.
    pub fn build<L, D, S, A>(
        self,
        reader: L,
        decoder: D,
        store: S,
        dispatcher: A,
    ) -> Result<ScanScheduler<L, D, S, A>, ListenerError>
    where
        L: LedgerReader,
        D: EventDecoder,
        S: StateStore,
        A: ActionDispatcher,
    {
        self.config.validate()?;
        if self.config.event_topic() != decoder.signature() {
            return Err(ListenerError::InvalidEventSignature(self.config.event_signature));
        }
        Ok(ScanScheduler::new(reader, decoder, store, dispatcher, self.config))
    }
}
