//! Integration tests for bgsort
//!
//! These tests drive real worker threads through the public coordinator API.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use bgsort::{
    CompletionEvent, CoordinatorConfig, CoordinatorError, CoordinatorState, EventKind, ExchangeEvent, SortAlgorithm,
    SortEvent, SortOutcome, TaskCoordinator, algorithm_fn,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn bubble() -> Arc<dyn SortAlgorithm> {
    algorithm_fn("bubble", |view| {
        let n = view.len();
        for pass in 0..n.saturating_sub(1) {
            for i in 0..n - 1 - pass {
                if view.is_cancellation_requested() {
                    return Ok(SortOutcome::Canceled);
                }
                if view[i] > view[i + 1] {
                    view.exchange(i, i + 1);
                }
            }
        }
        Ok(SortOutcome::Completed)
    })
}

/// Mirrors the array end to end, one exchange per pair
fn reverse() -> Arc<dyn SortAlgorithm> {
    algorithm_fn("reverse", |view| {
        let n = view.len();
        for i in 0..n / 2 {
            if view.is_cancellation_requested() {
                return Ok(SortOutcome::Canceled);
            }
            view.exchange(i, n - 1 - i);
        }
        Ok(SortOutcome::Completed)
    })
}

/// Keeps exchanging the first two slots until asked to stop
fn churn() -> Arc<dyn SortAlgorithm> {
    algorithm_fn("churn", |view| {
        loop {
            if view.is_cancellation_requested() {
                return Ok(SortOutcome::Canceled);
            }
            view.exchange(0, 1);
            thread::sleep(Duration::from_millis(1));
        }
    })
}

/// Waits for cancellation without reporting anything
fn idle_until_canceled() -> Arc<dyn SortAlgorithm> {
    algorithm_fn("idle", |view| {
        while !view.is_cancellation_requested() {
            thread::sleep(Duration::from_millis(1));
        }
        Ok(SortOutcome::Canceled)
    })
}

fn noop() -> Arc<dyn SortAlgorithm> {
    algorithm_fn("noop", |_view| Ok(SortOutcome::Completed))
}

type Log = Rc<RefCell<Vec<SortEvent>>>;

/// Subscribe handlers that record every event in delivery order
fn record(coordinator: &mut TaskCoordinator) -> Log {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    coordinator.subscribe_exchange(move |event| {
        sink.borrow_mut().push(SortEvent::Exchange(*event));
        Ok(())
    });
    let sink = log.clone();
    coordinator.subscribe_completion(move |event| {
        sink.borrow_mut().push(SortEvent::Completed(event.clone()));
        Ok(())
    });
    log
}

async fn finish(coordinator: &mut TaskCoordinator) -> CompletionEvent {
    tokio::time::timeout(TIMEOUT, coordinator.run_until_idle())
        .await
        .expect("run did not finish in time")
        .expect("no run was active")
}

fn exchanges(log: &Log) -> Vec<ExchangeEvent> {
    log.borrow().iter().filter_map(|event| event.as_exchange().copied()).collect()
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_bubble_sort_exchange_sequence() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![5, 3, 4, 1], bubble());
    let log = record(&mut coordinator);

    coordinator.start().unwrap();
    let completion = finish(&mut coordinator).await;

    let seen: Vec<_> = exchanges(&log)
        .iter()
        .map(|e| (e.first_value, e.second_value, e.first_index, e.second_index))
        .collect();
    assert_eq!(
        seen,
        vec![(3, 5, 0, 1), (4, 5, 1, 2), (1, 5, 2, 3), (1, 4, 1, 2), (1, 3, 0, 1)]
    );

    assert!(completion.is_success());
    assert_eq!(completion.exchanges, 5);
    assert_eq!(coordinator.take_array(), Some(vec![1, 3, 4, 5]));
}

#[tokio::test]
async fn test_completion_is_delivered_last() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), (0..100).collect(), reverse());
    let log = record(&mut coordinator);

    coordinator.start().unwrap();
    let completion = finish(&mut coordinator).await;

    let log = log.borrow();
    assert_eq!(log.len(), 51);
    assert!(log[..50].iter().all(|event| event.kind() == EventKind::Exchange));
    assert_eq!(log[50], SortEvent::Completed(completion.clone()));

    let indices: Vec<_> = log[..50]
        .iter()
        .filter_map(SortEvent::as_exchange)
        .map(|e| e.first_index)
        .collect();
    assert_eq!(indices, (0..50).collect::<Vec<_>>());
    assert_eq!(completion.exchanges, 50);
}

#[tokio::test]
async fn test_structured_transport_handles_large_arrays() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), (0..2000).collect(), reverse());
    let log = record(&mut coordinator);

    coordinator.start().unwrap();
    let completion = finish(&mut coordinator).await;

    assert_eq!(completion.exchanges, 1000);
    let first = exchanges(&log)[0];
    assert_eq!((first.first_index, first.second_index), (0, 1999));
    assert_eq!((first.first_value, first.second_value), (1999, 0));
}

#[tokio::test]
async fn test_packed_transport_delivers_same_events() {
    let input = vec![9, 4, 7, 1, 8, 2];

    let mut structured = TaskCoordinator::with_task(CoordinatorConfig::default(), input.clone(), bubble());
    let structured_log = record(&mut structured);
    structured.start().unwrap();
    finish(&mut structured).await;

    let mut packed = TaskCoordinator::with_task(CoordinatorConfig::packed(), input, bubble());
    let packed_log = record(&mut packed);
    packed.start().unwrap();
    finish(&mut packed).await;

    assert_eq!(exchanges(&structured_log), exchanges(&packed_log));
    assert_eq!(packed.take_array(), structured.take_array());
}

#[tokio::test]
async fn test_packed_transport_rejects_long_array() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::packed(), vec![0; 1001], noop());
    let err = coordinator.start().unwrap_err();
    assert!(matches!(err, CoordinatorError::ArrayTooLong { len: 1001, limit: 1000 }));
    assert_eq!(coordinator.state(), CoordinatorState::Idle);

    coordinator.set_array(vec![0; 1000]).unwrap();
    coordinator.start().unwrap();
    assert!(finish(&mut coordinator).await.is_success());
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_before_any_exchange() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![2, 1], idle_until_canceled());
    let log = record(&mut coordinator);

    coordinator.start().unwrap();
    coordinator.request_cancel();
    let completion = finish(&mut coordinator).await;

    assert!(completion.canceled);
    assert!(completion.fault.is_none());
    assert_eq!(completion.exchanges, 0);
    assert_eq!(log.borrow().len(), 1);
}

#[tokio::test]
async fn test_cancel_mid_run_delivers_every_reported_exchange() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![1, 2, 3], churn());
    coordinator.start().unwrap();

    let mut seen = 0;
    let completion = tokio::time::timeout(TIMEOUT, async {
        while let Some(event) = coordinator.next_event().await {
            match event {
                SortEvent::Exchange(_) => {
                    seen += 1;
                    if seen == 3 {
                        coordinator.request_cancel();
                    }
                }
                SortEvent::Completed(completion) => return Some(completion),
            }
        }
        None
    })
    .await
    .expect("run did not finish in time")
    .expect("completion missing");

    assert!(completion.canceled);
    assert!(seen >= 3);
    assert_eq!(completion.exchanges, seen);
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_repeated_cancel_yields_one_completion() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![2, 1], idle_until_canceled());
    let log = record(&mut coordinator);

    coordinator.start().unwrap();
    coordinator.request_cancel();
    coordinator.request_cancel();
    let flag = coordinator.cancel_flag().unwrap();
    assert!(flag.is_canceled());
    assert!(!flag.cancel());

    let completion = finish(&mut coordinator).await;
    assert!(completion.canceled);

    let completions = log.borrow().iter().filter(|e| e.kind() == EventKind::Completion).count();
    assert_eq!(completions, 1);

    // Cancel after completion is a no-op
    coordinator.request_cancel();
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_cancel_ignored_by_algorithm_is_not_reported_as_canceled() {
    let stubborn = algorithm_fn("stubborn", |view| {
        while !view.is_cancellation_requested() {
            thread::sleep(Duration::from_millis(1));
        }
        view.exchange(0, 1);
        Ok(SortOutcome::Completed)
    });
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![2, 1], stubborn);

    coordinator.start().unwrap();
    coordinator.request_cancel();
    let completion = finish(&mut coordinator).await;

    assert!(!completion.canceled);
    assert!(completion.is_success());
    assert_eq!(coordinator.take_array(), Some(vec![1, 2]));
}

// =============================================================================
// Faults
// =============================================================================

#[tokio::test]
async fn test_algorithm_error_becomes_fault() {
    let failing = algorithm_fn("failing", |view| {
        view.exchange(0, 1);
        Err(eyre::eyre!("comparison failed"))
    });
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![2, 1, 3], failing);
    let log = record(&mut coordinator);

    coordinator.start().unwrap();
    let completion = finish(&mut coordinator).await;

    assert!(!completion.canceled);
    assert!(completion.fault.as_deref().unwrap().contains("comparison failed"));
    assert_eq!(completion.exchanges, 1);

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].kind(), EventKind::Exchange);
    assert_eq!(log[1].kind(), EventKind::Completion);

    // The array comes back in whatever state the algorithm left it
    assert_eq!(coordinator.array(), Some(&[1, 2, 3][..]));
}

#[tokio::test]
async fn test_algorithm_panic_becomes_fault() {
    let panicking = algorithm_fn("panicking", |_view| panic!("boom"));
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![1, 2], panicking);

    coordinator.start().unwrap();
    let completion = finish(&mut coordinator).await;

    assert_eq!(completion.fault.as_deref(), Some("algorithm panicked: boom"));
    assert!(!completion.canceled);
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
    assert!(coordinator.array().is_some());
}

#[tokio::test]
async fn test_failing_handler_does_not_stop_delivery() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![5, 3, 4, 1], bubble());
    coordinator.subscribe_exchange(|_| Err(eyre::eyre!("renderer unavailable")));
    coordinator.subscribe_completion(|_| panic!("completion handler exploded"));
    let log = record(&mut coordinator);

    coordinator.start().unwrap();
    let completion = finish(&mut coordinator).await;

    assert!(completion.is_success());
    assert_eq!(exchanges(&log).len(), 5);
    assert_eq!(log.borrow().last().map(SortEvent::kind), Some(EventKind::Completion));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_without_configuration_fails_fast() {
    let mut coordinator = TaskCoordinator::new(CoordinatorConfig::default());
    let err = coordinator.start().unwrap_err();
    assert!(err.is_missing_configuration());
    assert!(matches!(err, CoordinatorError::MissingArray));

    coordinator.set_array(vec![3, 2, 1]).unwrap();
    let err = coordinator.start().unwrap_err();
    assert!(matches!(err, CoordinatorError::MissingAlgorithm));
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
    assert!(coordinator.next_event().await.is_none());
}

#[tokio::test]
async fn test_reconfigure_while_running_is_rejected() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![2, 1], idle_until_canceled());
    let first = coordinator.start().unwrap();
    assert_eq!(coordinator.run_id(), Some(first));

    let err = coordinator.start().unwrap_err();
    assert!(err.is_precondition_violation());
    assert!(matches!(coordinator.configure(vec![1], noop()), Err(CoordinatorError::AlreadyRunning { .. })));
    assert!(coordinator.set_array(vec![1]).is_err());
    assert!(coordinator.set_algorithm(noop()).is_err());
    assert_eq!(coordinator.algorithm_name(), Some("idle"));

    coordinator.request_cancel();
    finish(&mut coordinator).await;

    coordinator.configure(vec![3, 1, 2], bubble()).unwrap();
    let second = coordinator.start().unwrap();
    assert_ne!(first, second);

    let completion = finish(&mut coordinator).await;
    assert_eq!(completion.run_id, second);
    assert_eq!(coordinator.take_array(), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_unsubscribed_handler_is_not_called() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![2, 1], bubble());
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let id = coordinator.subscribe_exchange(move |_| {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    assert!(coordinator.unsubscribe(id));
    assert_eq!(coordinator.handler_count(EventKind::Exchange), 0);

    coordinator.start().unwrap();
    let completion = finish(&mut coordinator).await;

    assert_eq!(completion.exchanges, 1);
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_drop_while_running_stops_worker() {
    let steps = Arc::new(AtomicUsize::new(0));
    let counter = steps.clone();
    let looping = algorithm_fn("looping", move |view| {
        while !view.is_cancellation_requested() {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        }
        Ok(SortOutcome::Canceled)
    });

    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![3, 2, 1], looping);
    coordinator.start().unwrap();

    let deadline = std::time::Instant::now() + TIMEOUT;
    while steps.load(Ordering::SeqCst) == 0 {
        assert!(std::time::Instant::now() < deadline, "worker never started");
        thread::sleep(Duration::from_millis(1));
    }

    drop(coordinator);

    // Let the worker observe the flag and leave its loop
    thread::sleep(Duration::from_millis(20));
    let settled = steps.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(steps.load(Ordering::SeqCst), settled);
}

#[test]
fn test_dispatch_pending_without_runtime() {
    let mut coordinator = TaskCoordinator::with_task(CoordinatorConfig::default(), vec![4, 3, 2, 1], bubble());
    let log = record(&mut coordinator);
    coordinator.start().unwrap();

    let deadline = std::time::Instant::now() + TIMEOUT;
    while coordinator.is_running() {
        assert!(std::time::Instant::now() < deadline, "run did not complete");
        coordinator.dispatch_pending();
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(exchanges(&log).len(), 6);
    assert_eq!(coordinator.array(), Some(&[1, 2, 3, 4][..]));
}
