//! Read access to the source ledger.
//!
//! [`LedgerReader`] is the capability the scheduler consumes: the current tip height and the
//! logs matching one event signature over a closed block range. [`RobustProvider`] is the
//! RPC-backed implementation, wrapping an Alloy [`RootProvider`](alloy::providers::RootProvider)
//! with per-call timeouts, exponential backoff and ordered failover to fallback endpoints.
//!
//! ```rust,no_run
//! use alloy::primitives::{address, b256};
//! use bridge_listener::{
//!     LedgerReader,
//!     ledger::{RobustProvider, RobustProviderBuilder},
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader: RobustProvider = RobustProviderBuilder::new("http://localhost:8545")
//!     .fallback("http://localhost:8546")
//!     .call_timeout(Duration::from_secs(30))
//!     .build()
//!     .await?;
//!
//! let tip = reader.latest_height().await?;
//! let logs = reader
//!     .fetch_events(
//!         address!("0x7b79995e5f793a07bc00c21412e50eaae098e7f9"),
//!         b256!("0x0000000000000000000000000000000000000000000000000000000000000000"),
//!         tip.saturating_sub(10),
//!         tip,
//!     )
//!     .await?;
//! println!("{} logs", logs.len());
//! # Ok(()) }
//! ```

pub mod builder;
pub mod provider;
pub mod provider_conversion;

use alloy::{
    primitives::{Address, B256},
    rpc::types::Log,
};

pub use builder::RobustProviderBuilder;
pub use provider::RobustProvider;
pub use provider_conversion::IntoRootProvider;

use crate::{error::LedgerError, types::BlockHeight};

/// A raw log entry exactly as the source ledger returns it.
pub type RawLogEntry = Log;

/// Read-only view of a source ledger.
///
/// Implementations hold no scan state. Heights returned within a session are expected to be
/// non-decreasing, but callers must tolerate a lower value.
pub trait LedgerReader: Send + Sync {
    /// Latest block height known to the endpoint.
    fn latest_height(&self) -> impl Future<Output = Result<BlockHeight, LedgerError>> + Send;

    /// Logs emitted by `contract` with topic0 `signature` in `[from, to]`, ordered by
    /// `(block_number, log_index)`.
    ///
    /// # Errors
    ///
    /// * [`LedgerError::InvalidRange`] if `from > to`.
    /// * [`LedgerError::RangeTooLarge`] if the endpoint refuses the span.
    /// * [`LedgerError::Rpc`] / [`LedgerError::Timeout`] on connectivity failure.
    fn fetch_events(
        &self,
        contract: Address,
        signature: B256,
        from: BlockHeight,
        to: BlockHeight,
    ) -> impl Future<Output = Result<Vec<RawLogEntry>, LedgerError>> + Send;
}

/// Sorts logs into dispatch order.
///
/// Logs lacking a position sort first; the decoder rejects them anyway.
pub fn sort_by_position(logs: &mut [RawLogEntry]) {
    logs.sort_by_key(|log| (log.block_number, log.log_index));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positioned(block: u64, index: u64) -> Log {
        Log { block_number: Some(block), log_index: Some(index), ..Default::default() }
    }

    #[test]
    fn sorts_by_block_then_log_index() {
        let mut logs = vec![positioned(5, 1), positioned(3, 7), positioned(5, 0), positioned(3, 2)];

        sort_by_position(&mut logs);

        let order: Vec<_> =
            logs.iter().map(|l| (l.block_number.unwrap(), l.log_index.unwrap())).collect();
        assert_eq!(order, vec![(3, 2), (3, 7), (5, 0), (5, 1)]);
    }
}
