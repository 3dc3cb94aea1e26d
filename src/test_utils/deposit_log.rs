use alloy::{
    primitives::{Address, B256, Bytes, LogData, U256, keccak256},
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::{
    decoder::DepositInitiated,
    test_utils::{CONTRACT, DESTINATION_CHAIN, RECIPIENT, SENDER},
    types::BlockHeight,
};

/// Builds an RPC log carrying a `DepositInitiated` event.
///
/// The transaction hash is derived from the block and log index, so building the same position
/// twice yields the same [`EventId`](crate::EventId). Unless overridden, the nonce encodes the
/// position as `block * 1000 + log_index`.
#[derive(Debug, Clone)]
pub struct DepositLog {
    block: BlockHeight,
    log_index: u64,
    contract: Address,
    sender: Address,
    recipient: Address,
    amount: u64,
    nonce: u64,
    destination_chain: u64,
    malformed: bool,
}

impl DepositLog {
    #[must_use]
    pub fn new(block: BlockHeight, log_index: u64) -> Self {
        Self {
            block,
            log_index,
            contract: CONTRACT,
            sender: SENDER,
            recipient: RECIPIENT,
            amount: 1,
            nonce: block.saturating_mul(1_000).saturating_add(log_index),
            destination_chain: DESTINATION_CHAIN,
            malformed: false,
        }
    }

    #[must_use]
    pub fn contract(mut self, contract: Address) -> Self {
        self.contract = contract;
        self
    }

    #[must_use]
    pub fn recipient(mut self, recipient: Address) -> Self {
        self.recipient = recipient;
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    #[must_use]
    pub fn destination_chain(mut self, chain_id: u64) -> Self {
        self.destination_chain = chain_id;
        self
    }

    /// Keeps the topics but truncates the ABI payload so decoding fails.
    #[must_use]
    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    /// Hash shared by every log built for this position.
    #[must_use]
    pub fn tx_hash(block: BlockHeight, log_index: u64) -> B256 {
        let mut seed = [0u8; 16];
        seed[..8].copy_from_slice(&block.to_be_bytes());
        seed[8..].copy_from_slice(&log_index.to_be_bytes());
        keccak256(seed)
    }

    #[must_use]
    pub fn build(self) -> Log {
        let event = DepositInitiated {
            sender: self.sender,
            destinationChainId: U256::from(self.destination_chain),
            recipient: self.recipient,
            amount: U256::from(self.amount),
            nonce: U256::from(self.nonce),
        };
        let mut data = event.encode_log_data();
        if self.malformed {
            data = LogData::new_unchecked(data.topics().to_vec(), Bytes::from(vec![0u8; 7]));
        }

        Log {
            inner: alloy::primitives::Log { address: self.contract, data },
            block_hash: Some(keccak256(self.block.to_be_bytes())),
            block_number: Some(self.block),
            block_timestamp: None,
            transaction_hash: Some(Self::tx_hash(self.block, self.log_index)),
            transaction_index: Some(0),
            log_index: Some(self.log_index),
            removed: false,
        }
    }
}
