//! Turns raw logs into typed deposit events.

use alloy::{primitives::B256, sol, sol_types::SolEvent};

use crate::{
    error::DecodeError,
    ledger::RawLogEntry,
    types::{DomainEvent, EventId},
};

sol! {
    /// Emitted by the source bridge contract when a user locks funds for another chain.
    #[derive(Debug, PartialEq, Eq)]
    event DepositInitiated(
        address indexed sender,
        uint256 indexed destinationChainId,
        address recipient,
        uint256 amount,
        uint256 nonce
    );
}

/// Decodes one event kind.
///
/// Decoding must be pure: the same raw log always yields the same event, including its
/// [`EventId`].
pub trait EventDecoder: Send + Sync {
    /// topic0 of the logs this decoder understands.
    fn signature(&self) -> B256;

    fn decode(&self, log: &RawLogEntry) -> Result<DomainEvent, DecodeError>;
}

/// Decoder for [`DepositInitiated`] logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepositDecoder;

impl EventDecoder for DepositDecoder {
    fn signature(&self) -> B256 {
        DepositInitiated::SIGNATURE_HASH
    }

    fn decode(&self, log: &RawLogEntry) -> Result<DomainEvent, DecodeError> {
        let tx_hash = log.transaction_hash.ok_or(DecodeError::MissingField("transaction_hash"))?;
        let log_index = log.log_index.ok_or(DecodeError::MissingField("log_index"))?;
        let block_number = log.block_number.ok_or(DecodeError::MissingField("block_number"))?;

        let deposit = DepositInitiated::decode_log_data(log.data())
            .map_err(|e| DecodeError::InvalidPayload(e.to_string()))?;

        Ok(DomainEvent {
            id: EventId { tx_hash, log_index },
            sender: deposit.sender,
            recipient: deposit.recipient,
            amount: deposit.amount,
            source_nonce: deposit.nonce,
            destination_chain_id: deposit.destinationChainId,
            block_number,
        })
    }
}
