#![allow(dead_code)]

use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use bridge_listener::{
    DepositDecoder, ScanScheduler, ScanSchedulerBuilder, StateStore,
    test_utils::{CONTRACT, MemoryStateStore, MockLedger, RecordingDispatcher},
};
use tracing::dispatcher::DefaultGuard;
use tracing_subscriber::{filter::LevelFilter, util::SubscriberInitExt};

pub type Scheduler<S = MemoryStateStore> =
    ScanScheduler<MockLedger, DepositDecoder, S, RecordingDispatcher>;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub fn builder(max_chunk_size: u64) -> ScanSchedulerBuilder {
    ScanSchedulerBuilder::new()
        .contract_address(CONTRACT)
        .max_chunk_size(max_chunk_size)
        .poll_interval(POLL_INTERVAL)
}

pub fn build<S: StateStore>(
    builder: ScanSchedulerBuilder,
    ledger: &MockLedger,
    store: &S,
    dispatcher: &RecordingDispatcher,
) -> Scheduler<S>
where
    S: Clone,
{
    builder
        .build(ledger.clone(), DepositDecoder, store.clone(), dispatcher.clone())
        .expect("valid scheduler configuration")
}

pub fn setup_scheduler(
    ledger: &MockLedger,
    store: &MemoryStateStore,
    dispatcher: &RecordingDispatcher,
    max_chunk_size: u64,
) -> Scheduler {
    build(builder(max_chunk_size), ledger, store, dispatcher)
}

/// `(block, log_index)` of every dispatched record, in dispatch order.
///
/// Relies on the default [`DepositLog`](bridge_listener::test_utils::DepositLog) nonce, which
/// encodes the position.
pub fn dispatched_positions(dispatcher: &RecordingDispatcher) -> Vec<(u64, u64)> {
    dispatcher
        .records()
        .iter()
        .map(|record| {
            let nonce = record.source_nonce.to::<u64>();
            (nonce / 1_000, nonce % 1_000)
        })
        .collect()
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Routes `WARN` and `ERROR` events on the current thread here until the guard is dropped.
    pub fn warnings() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let guard = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(LevelFilter::WARN)
            .with_ansi(false)
            .finish()
            .set_default();
        (logs, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap()).lines().map(str::to_owned).collect()
    }

    /// Lines logged at `level` by this crate.
    pub fn at_level(&self, level: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| {
                line.split_whitespace().any(|word| word == level)
                    && line.contains("bridge_listener:")
            })
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
