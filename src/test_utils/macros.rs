/// Asserts that a poll cycle committed `[from, to]` and dispatched `dispatched` events.
#[macro_export]
macro_rules! assert_advanced {
    ($outcome: expr, from = $from: expr, to = $to: expr, dispatched = $dispatched: expr) => {
        match $outcome {
            $crate::CycleOutcome::Advanced { from, to, dispatched, .. } => {
                assert_eq!(
                    (from, to, dispatched),
                    ($from, $to, $dispatched),
                    "Expected (from, to, dispatched) = {:?}",
                    ($from, $to, $dispatched)
                );
            }
            other => panic!("Expected Advanced, got {:?}", other),
        }
    };
}

/// Asserts that a poll cycle aborted for a reason matching the given pattern.
#[macro_export]
macro_rules! assert_aborted {
    ($outcome: expr, $reason: pat) => {
        match $outcome {
            $crate::CycleOutcome::Aborted { reason: $reason } => {}
            other => panic!("Expected Aborted({}), got {:?}", stringify!($reason), other),
        }
    };
}

/// Asserts that a poll cycle found nothing new up to `latest`.
#[macro_export]
macro_rules! assert_up_to_date {
    ($outcome: expr, latest = $latest: expr) => {
        match $outcome {
            $crate::CycleOutcome::UpToDate { latest } => assert_eq!(latest, $latest),
            other => panic!("Expected UpToDate, got {:?}", other),
        }
    };
}
