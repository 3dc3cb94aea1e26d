//! In-memory doubles for driving a [`ScanScheduler`](crate::ScanScheduler) in tests.

mod deposit_log;
pub mod macros;
mod memory_store;
mod mock_ledger;
mod recording_dispatcher;

use std::time::Duration;

use alloy::primitives::{Address, address};

pub use deposit_log::DepositLog;
pub use memory_store::MemoryStateStore;
pub use mock_ledger::MockLedger;
pub use recording_dispatcher::RecordingDispatcher;

/// Bridge contract every [`DepositLog`] is emitted by.
pub const CONTRACT: Address = address!("0x7b79995e5f793a07bc00c21412e50eaae098e7f9");
/// Default depositor.
pub const SENDER: Address = address!("0x1111111111111111111111111111111111111111");
/// Default recipient on the destination chain.
pub const RECIPIENT: Address = address!("0x2222222222222222222222222222222222222222");
/// Default destination chain id.
pub const DESTINATION_CHAIN: u64 = 80_001;

/// Polls `condition` every few milliseconds until it holds.
///
/// # Panics
///
/// If the condition does not hold within five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait).await.expect("condition never held");
}
