use crate::{
    error::DispatchError,
    types::{ActionRecord, DomainEvent},
};

/// Hands a validated, non-duplicate event to the destination chain.
///
/// The scheduler calls `dispatch` strictly in `(block_number, log_index)` order from a single
/// task, and records the event as processed only after `Ok` is returned. An `Err` aborts the
/// current chunk without advancing the high-water-mark.
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, event: &DomainEvent) -> Result<ActionRecord, DispatchError>;
}

/// Dispatcher that only logs the mint/unlock the destination chain would have to perform.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher {
    destination_chain_id: Option<u64>,
}

impl LoggingDispatcher {
    #[must_use]
    pub const fn new(destination_chain_id: Option<u64>) -> Self {
        Self { destination_chain_id }
    }
}

impl ActionDispatcher for LoggingDispatcher {
    fn dispatch(&self, event: &DomainEvent) -> Result<ActionRecord, DispatchError> {
        let record = ActionRecord::from(event);
        info!(
            destination_chain = ?self.destination_chain_id,
            recipient = %record.recipient,
            amount = %record.amount,
            source_tx = %record.source_tx_hash,
            source_nonce = %record.source_nonce,
            "Mint/unlock required on destination chain"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decoder::DepositDecoder, decoder::EventDecoder, test_utils::DepositLog};
    use alloy::primitives::U256;

    #[test]
    fn logging_dispatcher_describes_the_event() {
        let log = DepositLog::new(3, 1).amount(1_000).nonce(4).build();
        let event = DepositDecoder.decode(&log).unwrap();

        let record = LoggingDispatcher::new(Some(80_001)).dispatch(&event).unwrap();

        assert_eq!(record.recipient, event.recipient);
        assert_eq!(record.amount, U256::from(1_000));
        assert_eq!(record.source_tx_hash, event.id.tx_hash);
        assert_eq!(record.source_log_index, 1);
        assert_eq!(record.source_nonce, U256::from(4));
    }
}
