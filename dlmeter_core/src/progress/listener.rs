use tokio::sync::mpsc;

use crate::types::ProgressUpdate;

/// Contract between a byte-counting producer and anything that wants to
/// observe download progress (UI, logger, metrics sink). Neither side knows
/// the other's concrete type.
///
/// Call sequence for a given `download_id`:
/// - `bytes_read` is cumulative and never decreases across calls;
/// - `content_length` is fixed once known (`None` when the server omitted it);
/// - `done` is true exactly once, on the terminal call, after which no
///   further calls are made for that identifier.
///
/// A failed transfer never produces a terminal call — `done` strictly means
/// the body was fully consumed. Failures surface through the byte stream's
/// own `Result` channel instead.
///
/// Calls for one identifier always come from the task polling that
/// download's stream, so they are ordered. A listener shared across
/// downloads may be called concurrently for distinct identifiers.
pub trait DownloadProgressListener: Send + Sync + 'static {
    fn update(&self, download_id: &str, bytes_read: u64, content_length: Option<u64>, done: bool);
}

/// Plain closures work as listeners.
impl<F> DownloadProgressListener for F
where
    F: Fn(&str, u64, Option<u64>, bool) + Send + Sync + 'static,
{
    fn update(&self, download_id: &str, bytes_read: u64, content_length: Option<u64>, done: bool) {
        self(download_id, bytes_read, content_length, done)
    }
}

/// Forwards each update as a [`ProgressUpdate`] over a bounded channel.
///
/// Uses `try_send` so a slow consumer drops updates instead of stalling the
/// transfer. The terminal update can be dropped too if the channel is full;
/// size the channel for the expected update rate.
pub struct ChannelListener {
    tx: mpsc::Sender<ProgressUpdate>,
}

impl ChannelListener {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl DownloadProgressListener for ChannelListener {
    fn update(&self, download_id: &str, bytes_read: u64, content_length: Option<u64>, done: bool) {
        let _ = self.tx.try_send(ProgressUpdate {
            download_id: download_id.to_string(),
            bytes_read,
            content_length,
            done,
        });
    }
}
