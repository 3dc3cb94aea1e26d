use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256};

use crate::{
    error::LedgerError,
    ledger::{LedgerReader, RawLogEntry},
    types::BlockHeight,
};

#[derive(Debug, Default)]
struct Inner {
    tip: BlockHeight,
    logs: Vec<RawLogEntry>,
    height_failures: usize,
    fetch_failures: usize,
    max_span: Option<u64>,
    reverse_results: bool,
    stall_fetches: bool,
    fetch_calls: Vec<(BlockHeight, BlockHeight)>,
}

/// Scripted [`LedgerReader`]. Clones share the same chain.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    inner: Arc<Mutex<Inner>>,
}

impl MockLedger {
    #[must_use]
    pub fn new(tip: BlockHeight) -> Self {
        let ledger = Self::default();
        ledger.set_tip(tip);
        ledger
    }

    #[must_use]
    pub fn with_logs(self, logs: impl IntoIterator<Item = RawLogEntry>) -> Self {
        self.push_logs(logs);
        self
    }

    /// The next `n` `latest_height` calls time out.
    #[must_use]
    pub fn fail_next_heights(self, n: usize) -> Self {
        self.inner.lock().unwrap().height_failures = n;
        self
    }

    /// The next `n` `fetch_events` calls time out.
    #[must_use]
    pub fn fail_next_fetches(self, n: usize) -> Self {
        self.inner.lock().unwrap().fetch_failures = n;
        self
    }

    /// Queries spanning more than `blocks` are rejected as too large.
    #[must_use]
    pub fn max_span(self, blocks: u64) -> Self {
        self.inner.lock().unwrap().max_span = Some(blocks);
        self
    }

    /// Each `fetch_events` answer is returned newest first.
    #[must_use]
    pub fn reverse_results(self) -> Self {
        self.inner.lock().unwrap().reverse_results = true;
        self
    }

    /// `fetch_events` never completes.
    #[must_use]
    pub fn stall_fetches(self) -> Self {
        self.inner.lock().unwrap().stall_fetches = true;
        self
    }

    pub fn set_tip(&self, tip: BlockHeight) {
        self.inner.lock().unwrap().tip = tip;
    }

    pub fn push_logs(&self, logs: impl IntoIterator<Item = RawLogEntry>) {
        self.inner.lock().unwrap().logs.extend(logs);
    }

    /// Every `(from, to)` passed to `fetch_events`, in call order.
    #[must_use]
    pub fn fetch_calls(&self) -> Vec<(BlockHeight, BlockHeight)> {
        self.inner.lock().unwrap().fetch_calls.clone()
    }
}

impl LedgerReader for MockLedger {
    async fn latest_height(&self) -> Result<BlockHeight, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.height_failures > 0 {
            inner.height_failures -= 1;
            return Err(LedgerError::Timeout);
        }
        Ok(inner.tip)
    }

    async fn fetch_events(
        &self,
        contract: Address,
        signature: B256,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<Vec<RawLogEntry>, LedgerError> {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetch_calls.push((from, to));

            if inner.stall_fetches {
                None
            } else if inner.fetch_failures > 0 {
                inner.fetch_failures -= 1;
                Some(Err(LedgerError::Timeout))
            } else if from > to {
                Some(Err(LedgerError::InvalidRange { from, to }))
            } else if inner.max_span.is_some_and(|max| to - from + 1 > max) {
                Some(Err(LedgerError::RangeTooLarge { from, to }))
            } else {
                let mut logs: Vec<RawLogEntry> = inner
                    .logs
                    .iter()
                    .filter(|log| {
                        log.inner.address == contract
                            && log.inner.data.topics().first() == Some(&signature)
                            && log.block_number.is_some_and(|b| (from..=to).contains(&b))
                    })
                    .cloned()
                    .collect();
                if inner.reverse_results {
                    logs.reverse();
                }
                Some(Ok(logs))
            }
        };

        match result {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}
