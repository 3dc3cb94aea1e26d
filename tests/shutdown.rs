mod common;

use std::time::Duration;

use bridge_listener::{
    ScanState, SchedulerState,
    test_utils::{DepositLog, MemoryStateStore, MockLedger, RecordingDispatcher, eventually},
};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::{Scheduler, dispatched_positions, setup_scheduler};

fn spawn_run(
    mut scheduler: Scheduler,
    token: CancellationToken,
) -> tokio::task::JoinHandle<(Scheduler, Result<(), bridge_listener::ListenerError>)> {
    tokio::spawn(async move {
        let result = scheduler.run(token).await;
        (scheduler, result)
    })
}

#[tokio::test(start_paused = true)]
async fn picks_up_new_blocks_on_later_polls() -> anyhow::Result<()> {
    let ledger = MockLedger::new(10).with_logs([DepositLog::new(8, 0).build()]);
    let store = MemoryStateStore::with_state(5);
    let dispatcher = RecordingDispatcher::new();
    let token = CancellationToken::new();
    let handle = spawn_run(setup_scheduler(&ledger, &store, &dispatcher, 10), token.clone());

    eventually(|| store.current() == Some(ScanState::new(10))).await;

    ledger.push_logs([DepositLog::new(13, 1).build()]);
    ledger.set_tip(15);
    eventually(|| store.current() == Some(ScanState::new(15))).await;

    token.cancel();
    let (scheduler, result) = timeout(Duration::from_secs(1), handle).await??;

    result?;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(dispatched_positions(&dispatcher), vec![(8, 0), (13, 1)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_idle_wait() -> anyhow::Result<()> {
    let ledger = MockLedger::new(10);
    let store = MemoryStateStore::with_state(10);
    let dispatcher = RecordingDispatcher::new();
    let scheduler = bridge_listener::ScanSchedulerBuilder::new()
        .poll_interval(Duration::from_secs(3_600))
        .build(ledger.clone(), bridge_listener::DepositDecoder, store.clone(), dispatcher.clone())?;
    let token = CancellationToken::new();
    let handle = spawn_run(scheduler, token.clone());

    // let the first cycle finish and the scheduler go idle
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let (scheduler, result) = timeout(Duration::from_secs(1), handle).await??;
    result?;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_a_stalled_fetch() -> anyhow::Result<()> {
    let ledger = MockLedger::new(50).with_logs([DepositLog::new(20, 0).build()]).stall_fetches();
    let store = MemoryStateStore::with_state(10);
    let dispatcher = RecordingDispatcher::new();
    let token = CancellationToken::new();
    let handle = spawn_run(setup_scheduler(&ledger, &store, &dispatcher, 100), token.clone());

    eventually(|| !ledger.fetch_calls().is_empty()).await;
    token.cancel();

    let (scheduler, result) = timeout(Duration::from_secs(1), handle).await??;
    result?;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(scheduler.last_processed_block(), Some(10));
    assert!(dispatcher.records().is_empty());
    assert!(store.writes().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn fatal_error_stops_the_loop() -> anyhow::Result<()> {
    let ledger = MockLedger::new(50).max_span(0);
    let store = MemoryStateStore::with_state(10);
    let dispatcher = RecordingDispatcher::new();
    let handle =
        spawn_run(setup_scheduler(&ledger, &store, &dispatcher, 8), CancellationToken::new());

    let (scheduler, result) = timeout(Duration::from_secs(1), handle).await??;

    assert!(matches!(
        result,
        Err(bridge_listener::ListenerError::RangeTooLargeAtMinimum { block: 11 })
    ));
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(store.current(), Some(ScanState::new(10)));
    Ok(())
}
