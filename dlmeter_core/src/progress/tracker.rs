use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use super::listener::DownloadProgressListener;
use super::snapshot::DownloadSnapshot;

/// EMA smoothing factor. 0.3 = responsive but stable.
const EMA_ALPHA: f64 = 0.3;

/// Internal per-download tracking (purely data, no UI).
struct DownloadState {
    bytes_read: u64,
    content_length: Option<u64>,
    speed: f64,
    started: Instant,
    last_update: Instant,
    done: bool,
}

#[derive(Default)]
struct TrackerInner {
    downloads: HashMap<String, DownloadState>,
    /// Insertion-order tracking so snapshot listings are stable.
    order: Vec<String>,
}

/// Aggregates raw listener calls into pollable [`DownloadSnapshot`]s.
///
/// Register a shared `Arc<ProgressTracker>` as the client listener, then
/// poll [`snapshot`](Self::snapshot) / [`snapshots`](Self::snapshots) from
/// wherever the numbers are displayed or exported.
#[derive(Default)]
pub struct ProgressTracker {
    inner: RwLock<TrackerInner>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, download_id: &str) -> Option<DownloadSnapshot> {
        let inner = self.inner.read().unwrap();
        inner
            .downloads
            .get(download_id)
            .map(|state| build_snapshot(download_id, state))
    }

    /// Snapshots of every tracked download, in first-seen order.
    pub fn snapshots(&self) -> Vec<DownloadSnapshot> {
        let inner = self.inner.read().unwrap();
        inner
            .order
            .iter()
            .filter_map(|id| inner.downloads.get(id).map(|state| build_snapshot(id, state)))
            .collect()
    }

    /// True when every tracked download has received its terminal update.
    pub fn all_done(&self) -> bool {
        let inner = self.inner.read().unwrap();
        !inner.downloads.is_empty() && inner.downloads.values().all(|s| s.done)
    }
}

fn build_snapshot(download_id: &str, state: &DownloadState) -> DownloadSnapshot {
    let eta_secs = match (state.done, state.content_length) {
        (false, Some(total)) if state.speed > 0.0 => {
            total.saturating_sub(state.bytes_read) as f64 / state.speed
        }
        _ => 0.0,
    };
    DownloadSnapshot {
        download_id: download_id.to_string(),
        bytes_read: state.bytes_read,
        content_length: state.content_length,
        speed: state.speed,
        eta_secs,
        done: state.done,
    }
}

impl DownloadProgressListener for ProgressTracker {
    fn update(&self, download_id: &str, bytes_read: u64, content_length: Option<u64>, done: bool) {
        let now = Instant::now();
        let mut inner = self.inner.write().unwrap();

        // Lazy init: track a new identifier on first sight
        if !inner.downloads.contains_key(download_id) {
            inner.order.push(download_id.to_string());
            inner.downloads.insert(
                download_id.to_string(),
                DownloadState {
                    bytes_read: 0,
                    content_length,
                    speed: 0.0,
                    started: now,
                    last_update: now,
                    done: false,
                },
            );
        }

        let state = inner.downloads.get_mut(download_id).unwrap();

        let delta = bytes_read.saturating_sub(state.bytes_read);
        state.bytes_read = bytes_read;
        if state.content_length.is_none() {
            state.content_length = content_length;
        }

        if done {
            // Whole-transfer average is more honest than the last EMA value.
            let elapsed = now.duration_since(state.started).as_secs_f64();
            if elapsed > 0.0 {
                state.speed = bytes_read as f64 / elapsed;
            }
            state.done = true;
            return;
        }

        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        if elapsed > 0.0 {
            let instant_speed = delta as f64 / elapsed;
            state.speed = EMA_ALPHA * instant_speed + (1.0 - EMA_ALPHA) * state.speed;
            state.last_update = now;
        }
    }
}
