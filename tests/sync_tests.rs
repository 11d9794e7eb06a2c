mod common;

use common::RecordingSink;
use scoutbox::kernel::layout::FormKind;
use scoutbox::outbox::{ConnectivityMonitor, MemoryOutboxStore, Outbox, SubmissionSink, SyncCoordinator};
use scoutbox::Notice;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

struct Harness {
    outbox: Outbox,
    sink: Arc<RecordingSink>,
    connectivity: ConnectivityMonitor,
    notices: mpsc::Receiver<Notice>,
}

fn harness(online: bool) -> (Harness, SyncCoordinator) {
    let outbox = Outbox::new(MemoryOutboxStore::new());
    let sink = Arc::new(RecordingSink::succeeding());
    let connectivity = ConnectivityMonitor::new(online);
    let (tx, rx) = mpsc::channel(16);
    let dyn_sink: Arc<dyn SubmissionSink> = sink.clone();
    let coordinator = SyncCoordinator::new(outbox.clone(), dyn_sink, connectivity.clone(), tx)
        .with_interval(Duration::from_secs(30))
        .with_startup_delay(Duration::from_secs(2));
    (
        Harness {
            outbox,
            sink,
            connectivity,
            notices: rx,
        },
        coordinator,
    )
}

fn drain(rx: &mut mpsc::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_startup_flush_when_online() {
    let (mut h, coordinator) = harness(true);
    h.outbox.enqueue(FormKind::Match, json!({ "n": 1 })).await.unwrap();
    let handle = coordinator.spawn();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.sink.attempts(), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(h.sink.delivered().len(), 1);
    assert!(h.outbox.is_empty().await.unwrap());
    assert_eq!(drain(&mut h.notices), vec![Notice::SyncCompleted { count: 1 }]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_nothing_flushed_while_offline() {
    let (h, coordinator) = harness(false);
    h.outbox.enqueue(FormKind::Match, json!({ "n": 1 })).await.unwrap();
    let handle = coordinator.spawn();

    sleep(Duration::from_secs(95)).await;
    assert_eq!(h.sink.attempts(), 0);
    assert_eq!(h.outbox.len().await.unwrap(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_online_transition_triggers_flush() {
    let (mut h, coordinator) = harness(false);
    h.outbox.enqueue(FormKind::Pit, json!({ "n": 1 })).await.unwrap();
    let handle = coordinator.spawn();
    sleep(Duration::from_secs(5)).await;

    h.connectivity.set_online(true);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(h.sink.delivered().len(), 1);
    assert_eq!(
        drain(&mut h.notices),
        vec![Notice::BackOnline, Notice::SyncCompleted { count: 1 }]
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_going_offline_warns() {
    let (mut h, coordinator) = harness(true);
    let handle = coordinator.spawn();
    sleep(Duration::from_secs(3)).await;

    h.connectivity.set_online(false);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(drain(&mut h.notices), vec![Notice::WentOffline]);

    // Repeating the same state is not a transition.
    h.connectivity.set_online(false);
    sleep(Duration::from_millis(10)).await;
    assert!(drain(&mut h.notices).is_empty());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_recurring_interval_flush() {
    let (h, coordinator) = harness(true);
    let handle = coordinator.spawn();
    sleep(Duration::from_secs(5)).await;

    h.outbox.enqueue(FormKind::Match, json!({ "n": 1 })).await.unwrap();
    sleep(Duration::from_secs(20)).await;
    assert_eq!(h.sink.attempts(), 0);

    sleep(Duration::from_secs(6)).await;
    assert_eq!(h.sink.delivered().len(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_flush_keeps_entries_and_stays_quiet() {
    let (mut h, coordinator) = harness(true);
    h.sink.set_failing(true);
    h.outbox.enqueue(FormKind::Match, json!({ "n": 1 })).await.unwrap();
    let handle = coordinator.spawn();

    sleep(Duration::from_secs(3)).await;
    assert_eq!(h.sink.attempts(), 1);
    assert_eq!(h.outbox.len().await.unwrap(), 1);
    assert!(drain(&mut h.notices).is_empty());

    h.sink.set_failing(false);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.outbox.len().await.unwrap(), 0);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_loop() {
    let (h, coordinator) = harness(true);
    let handle = coordinator.spawn();
    sleep(Duration::from_secs(3)).await;
    handle.shutdown().await;

    h.outbox.enqueue(FormKind::Match, json!({ "n": 1 })).await.unwrap();
    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.sink.attempts(), 0);
}
