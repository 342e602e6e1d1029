use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dlmeter_core::progress::dispatcher::ProgressDispatcher;
use dlmeter_core::progress::listener::{ChannelListener, DownloadProgressListener};
use dlmeter_core::progress::snapshot::format_bytes;
use dlmeter_core::progress::tracker::ProgressTracker;
use dlmeter_core::types::ProgressUpdate;

/// Test double that records every listener call in order.
#[derive(Default)]
struct RecordingListener {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingListener {
    fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl DownloadProgressListener for RecordingListener {
    fn update(&self, download_id: &str, bytes_read: u64, content_length: Option<u64>, done: bool) {
        self.updates.lock().unwrap().push(ProgressUpdate {
            download_id: download_id.to_string(),
            bytes_read,
            content_length,
            done,
        });
    }
}

// ---------------------------------------------------------------
// ProgressTracker
// ---------------------------------------------------------------

#[test]
fn tracker_aggregates_updates_into_snapshots() {
    let tracker = ProgressTracker::new();

    tracker.update("a", 100, Some(1000), false);
    tracker.update("a", 400, Some(1000), false);

    let snap = tracker.snapshot("a").unwrap();
    assert_eq!(snap.download_id, "a");
    assert_eq!(snap.bytes_read, 400);
    assert_eq!(snap.content_length, Some(1000));
    assert!(!snap.done);

    assert!(tracker.snapshot("missing").is_none());
}

#[test]
fn tracker_lists_snapshots_in_first_seen_order() {
    let tracker = ProgressTracker::new();

    tracker.update("b", 10, Some(100), false);
    tracker.update("a", 20, Some(200), false);
    tracker.update("b", 30, Some(100), false);

    let ids: Vec<String> = tracker
        .snapshots()
        .into_iter()
        .map(|s| s.download_id)
        .collect();
    assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn tracker_finishes_with_average_speed_and_zero_eta() {
    let tracker = ProgressTracker::new();

    tracker.update("dl", 4096, Some(8192), false);
    std::thread::sleep(Duration::from_millis(20));
    tracker.update("dl", 8192, Some(8192), true);

    let snap = tracker.snapshot("dl").unwrap();
    assert!(snap.done);
    assert_eq!(snap.bytes_read, 8192);
    assert!(snap.speed > 0.0, "done snapshot carries the average speed");
    assert_eq!(snap.eta_secs, 0.0);
}

#[test]
fn tracker_learns_content_length_late() {
    let tracker = ProgressTracker::new();

    tracker.update("late", 10, None, false);
    tracker.update("late", 20, Some(50), false);

    let snap = tracker.snapshot("late").unwrap();
    assert_eq!(snap.content_length, Some(50));
}

#[test]
fn tracker_all_done_requires_every_download_finished() {
    let tracker = ProgressTracker::new();
    assert!(!tracker.all_done(), "empty tracker is not done");

    tracker.update("x", 5, Some(5), false);
    tracker.update("y", 3, Some(3), true);
    assert!(!tracker.all_done());

    tracker.update("x", 5, Some(5), true);
    assert!(tracker.all_done());
}

#[test]
fn snapshot_serializes_to_json() {
    let tracker = ProgressTracker::new();
    tracker.update("json-dl", 512, Some(2048), false);

    let snap = tracker.snapshot("json-dl").unwrap();
    let value = serde_json::to_value(&snap).unwrap();
    assert_eq!(value["download_id"], "json-dl");
    assert_eq!(value["bytes_read"], 512);
    assert_eq!(value["content_length"], 2048);
    assert_eq!(value["done"], false);
}

// ---------------------------------------------------------------
// ProgressDispatcher
// ---------------------------------------------------------------

#[test]
fn dispatcher_routes_global_and_per_id_listeners() {
    let dispatcher = ProgressDispatcher::new();

    let global = Arc::new(RecordingListener::default());
    let only_a = Arc::new(RecordingListener::default());
    dispatcher.add_listener(global.clone());
    dispatcher.add_listener_for("a", only_a.clone());
    assert_eq!(dispatcher.listener_count(), 2);

    dispatcher.update("a", 10, Some(100), false);
    dispatcher.update("b", 20, Some(200), false);

    assert_eq!(global.updates().len(), 2, "global listener sees every id");
    let scoped = only_a.updates();
    assert_eq!(scoped.len(), 1, "per-id listener sees only its own id");
    assert_eq!(scoped[0].download_id, "a");
}

#[test]
fn dispatcher_stops_delivering_after_unregistration() {
    let dispatcher = ProgressDispatcher::new();

    let listener = Arc::new(RecordingListener::default());
    dispatcher.add_listener_for("a", listener.clone());

    dispatcher.update("a", 1, None, false);
    dispatcher.remove_listeners_for("a");
    dispatcher.update("a", 2, None, true);

    assert_eq!(listener.updates().len(), 1);
    assert_eq!(dispatcher.listener_count(), 0);
}

#[test]
fn closures_work_as_listeners() {
    let observed = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&observed);

    let dispatcher = ProgressDispatcher::new();
    dispatcher.add_listener(Arc::new(
        move |_id: &str, bytes_read: u64, _len: Option<u64>, _done: bool| {
            sink.store(bytes_read, Ordering::SeqCst);
        },
    ));

    dispatcher.update("closure-dl", 77, Some(100), false);
    assert_eq!(observed.load(Ordering::SeqCst), 77);
}

// ---------------------------------------------------------------
// ChannelListener
// ---------------------------------------------------------------

#[tokio::test]
async fn channel_listener_forwards_updates() {
    let (listener, mut rx) = ChannelListener::new(16);

    listener.update("chan-dl", 128, Some(256), false);
    listener.update("chan-dl", 256, Some(256), true);

    let first = rx.recv().await.unwrap();
    assert_eq!(
        first,
        ProgressUpdate {
            download_id: "chan-dl".to_string(),
            bytes_read: 128,
            content_length: Some(256),
            done: false,
        }
    );
    let second = rx.recv().await.unwrap();
    assert!(second.done);
}

#[tokio::test]
async fn channel_listener_drops_updates_when_full() {
    let (listener, mut rx) = ChannelListener::new(1);

    listener.update("busy-dl", 1, None, false);
    listener.update("busy-dl", 2, None, false); // dropped, channel full

    assert_eq!(rx.recv().await.unwrap().bytes_read, 1);
    assert!(rx.try_recv().is_err());
}

// ---------------------------------------------------------------
// format_bytes
// ---------------------------------------------------------------

#[test]
fn format_bytes_picks_sensible_units() {
    assert_eq!(format_bytes(512), "512 B");
    assert_eq!(format_bytes(2048), "2.0 KB");
    assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
}
