use std::{fmt, ops::RangeInclusive};

use alloy::primitives::{Address, BlockNumber, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Height of a block on the source ledger.
pub type BlockHeight = BlockNumber;

/// The durable high-water-mark.
///
/// Serialized as `{ "last_processed_block": <integer> }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    pub last_processed_block: BlockHeight,
}

impl ScanState {
    #[must_use]
    pub const fn new(last_processed_block: BlockHeight) -> Self {
        Self { last_processed_block }
    }

    /// First block that still has to be scanned.
    #[must_use]
    pub const fn next_block(&self) -> BlockHeight {
        self.last_processed_block.saturating_add(1)
    }
}

/// A contiguous, inclusive block range that is scanned and committed as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub from: BlockHeight,
    pub to: BlockHeight,
}

impl Chunk {
    /// Creates a chunk, rejecting inverted ranges.
    pub fn new(from: BlockHeight, to: BlockHeight) -> Result<Self, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Number of blocks covered by the chunk.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    /// A chunk always covers at least one block.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl From<Chunk> for RangeInclusive<BlockHeight> {
    fn from(chunk: Chunk) -> Self {
        chunk.from..=chunk.to
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Identity of a single event occurrence: the emitting transaction and the log's position in
/// its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    pub tx_hash: TxHash,
    pub log_index: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.log_index)
    }
}

/// A validated `DepositInitiated` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    pub id: EventId,
    pub sender: Address,
    pub recipient: Address,
    pub amount: U256,
    pub source_nonce: U256,
    pub destination_chain_id: U256,
    pub block_number: BlockHeight,
}

/// Description of the mint/unlock the destination chain has to perform for one deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub recipient: Address,
    pub amount: U256,
    pub source_tx_hash: TxHash,
    pub source_log_index: u64,
    pub source_nonce: U256,
    pub destination_chain_id: U256,
}

impl From<&DomainEvent> for ActionRecord {
    fn from(event: &DomainEvent) -> Self {
        Self {
            recipient: event.recipient,
            amount: event.amount,
            source_tx_hash: event.id.tx_hash,
            source_log_index: event.id.log_index,
            source_nonce: event.source_nonce,
            destination_chain_id: event.destination_chain_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_rejects_inverted_range() {
        assert!(matches!(Chunk::new(10, 9), Err(LedgerError::InvalidRange { from: 10, to: 9 })));
    }

    #[test]
    fn chunk_len_is_inclusive() {
        assert_eq!(Chunk::new(100, 104).unwrap().len(), 5);
        assert_eq!(Chunk::new(7, 7).unwrap().len(), 1);
    }

    #[test]
    fn scan_state_uses_snake_case_json() {
        let json = serde_json::to_string(&ScanState::new(42)).unwrap();
        assert_eq!(json, r#"{"last_processed_block":42}"#);

        let state: ScanState = serde_json::from_str(r#"{ "last_processed_block": 7 }"#).unwrap();
        assert_eq!(state.next_block(), 8);
    }
}
