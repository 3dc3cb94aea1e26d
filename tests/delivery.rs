mod common;

use bridge_listener::{
    AbortReason, CycleOutcome, ScanState, assert_aborted, assert_advanced,
    test_utils::{DepositLog, MemoryStateStore, MockLedger, RecordingDispatcher},
};
use tokio_util::sync::CancellationToken;

use crate::common::{CapturedLogs, build, builder, dispatched_positions, setup_scheduler};

#[tokio::test]
async fn dispatches_in_block_and_log_order() -> anyhow::Result<()> {
    let ledger = MockLedger::new(20)
        .with_logs([
            DepositLog::new(17, 3).build(),
            DepositLog::new(4, 1).build(),
            DepositLog::new(12, 0).build(),
            DepositLog::new(4, 0).build(),
            DepositLog::new(17, 1).build(),
            DepositLog::new(9, 5).build(),
        ])
        .reverse_results();
    let store = MemoryStateStore::with_state(0);
    let dispatcher = RecordingDispatcher::new();
    let mut scheduler = build(
        builder(10).max_fetch_span(3).max_concurrent_fetches(3),
        &ledger,
        &store,
        &dispatcher,
    );

    assert_advanced!(
        scheduler.poll_once(&CancellationToken::new()).await?,
        from = 1,
        to = 20,
        dispatched = 6
    );
    assert_eq!(
        dispatched_positions(&dispatcher),
        vec![(4, 0), (4, 1), (9, 5), (12, 0), (17, 1), (17, 3)]
    );
    Ok(())
}

#[tokio::test]
async fn malformed_event_is_skipped_and_the_chunk_commits() -> anyhow::Result<()> {
    let ledger = MockLedger::new(10).with_logs([
        DepositLog::new(5, 0).build(),
        DepositLog::new(5, 1).malformed().build(),
        DepositLog::new(5, 2).build(),
    ]);
    let store = MemoryStateStore::with_state(0);
    let dispatcher = RecordingDispatcher::new();
    let mut scheduler = setup_scheduler(&ledger, &store, &dispatcher, 10);

    let outcome = scheduler.poll_once(&CancellationToken::new()).await?;

    assert!(matches!(
        outcome,
        CycleOutcome::Advanced { from: 1, to: 10, dispatched: 2, skipped_malformed: 1 }
    ));
    assert_eq!(dispatched_positions(&dispatcher), vec![(5, 0), (5, 2)]);
    assert_eq!(store.current(), Some(ScanState::new(10)));
    Ok(())
}

#[cfg(feature = "tracing")]
#[tokio::test]
async fn malformed_event_logs_a_single_warning() -> anyhow::Result<()> {
    let (logs, _guard) = CapturedLogs::warnings();
    let ledger = MockLedger::new(10).with_logs([
        DepositLog::new(5, 0).build(),
        DepositLog::new(5, 1).malformed().build(),
        DepositLog::new(5, 2).build(),
    ]);
    let store = MemoryStateStore::with_state(0);
    let dispatcher = RecordingDispatcher::new();
    let mut scheduler = setup_scheduler(&ledger, &store, &dispatcher, 10);

    scheduler.poll_once(&CancellationToken::new()).await?;

    assert_eq!(dispatcher.records().len(), 2);
    let warnings = logs.at_level("WARN");
    assert_eq!(warnings.len(), 1, "unexpected warnings: {warnings:#?}");
    assert!(warnings[0].contains("Skipping malformed event"));
    assert!(warnings[0].contains("log_index=Some(1)"));
    assert!(logs.at_level("ERROR").is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_log_in_a_response_is_dispatched_once() -> anyhow::Result<()> {
    let ledger = MockLedger::new(10).with_logs([
        DepositLog::new(3, 0).build(),
        DepositLog::new(3, 0).build(),
        DepositLog::new(8, 2).build(),
    ]);
    let store = MemoryStateStore::with_state(0);
    let dispatcher = RecordingDispatcher::new();
    let mut scheduler = setup_scheduler(&ledger, &store, &dispatcher, 10);

    assert_advanced!(
        scheduler.poll_once(&CancellationToken::new()).await?,
        from = 1,
        to = 10,
        dispatched = 2
    );
    assert_eq!(dispatched_positions(&dispatcher), vec![(3, 0), (8, 2)]);
    assert_eq!(dispatcher.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn logs_from_other_contracts_are_not_dispatched() -> anyhow::Result<()> {
    let other = alloy::primitives::Address::repeat_byte(0x42);
    let ledger = MockLedger::new(10).with_logs([
        DepositLog::new(2, 0).contract(other).build(),
        DepositLog::new(2, 1).build(),
    ]);
    let store = MemoryStateStore::with_state(0);
    let dispatcher = RecordingDispatcher::new();
    let mut scheduler = setup_scheduler(&ledger, &store, &dispatcher, 10);

    scheduler.poll_once(&CancellationToken::new()).await?;

    assert_eq!(dispatched_positions(&dispatcher), vec![(2, 1)]);
    Ok(())
}

#[tokio::test]
async fn transient_fetch_failure_is_retried_next_poll() -> anyhow::Result<()> {
    let ledger = MockLedger::new(10)
        .with_logs([DepositLog::new(4, 0).build(), DepositLog::new(9, 0).build()])
        .fail_next_fetches(1);
    let store = MemoryStateStore::with_state(0);
    let dispatcher = RecordingDispatcher::new();
    let mut scheduler = setup_scheduler(&ledger, &store, &dispatcher, 5);
    let token = CancellationToken::new();

    assert_aborted!(scheduler.poll_once(&token).await?, AbortReason::Ledger(_));
    assert!(dispatcher.records().is_empty());
    assert_eq!(store.current(), Some(ScanState::new(0)));

    assert_advanced!(scheduler.poll_once(&token).await?, from = 1, to = 10, dispatched = 2);
    assert_eq!(store.writes(), vec![ScanState::new(5), ScanState::new(10)]);
    Ok(())
}

#[tokio::test]
async fn oversized_range_is_split_without_losing_events() -> anyhow::Result<()> {
    let ledger = MockLedger::new(30)
        .with_logs((1..=30).step_by(3).map(|block| DepositLog::new(block, 0).build()))
        .max_span(4);
    let store = MemoryStateStore::with_state(0);
    let dispatcher = RecordingDispatcher::new();
    let mut scheduler = setup_scheduler(&ledger, &store, &dispatcher, 16);

    assert_advanced!(
        scheduler.poll_once(&CancellationToken::new()).await?,
        from = 1,
        to = 30,
        dispatched = 10
    );
    assert_eq!(
        dispatched_positions(&dispatcher),
        (1..=30).step_by(3).map(|block| (block, 0)).collect::<Vec<_>>()
    );
    assert_eq!(store.current(), Some(ScanState::new(30)));

    // the shrunken size only lasts for the cycle
    ledger.set_tip(60);
    scheduler.poll_once(&CancellationToken::new()).await?;
    assert!(ledger.fetch_calls().contains(&(31, 46)));
    Ok(())
}
