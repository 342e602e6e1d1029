use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single progress report for one download.
///
/// Mirrors the four arguments of
/// [`DownloadProgressListener::update`](crate::progress::listener::DownloadProgressListener::update)
/// so updates can be queued on channels or encoded as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub download_id: String,
    /// Cumulative bytes read so far. Non-decreasing per download.
    pub bytes_read: u64,
    /// Expected total size. `None` when the server did not report one.
    pub content_length: Option<u64>,
    /// True exactly once, on the final update for a download.
    pub done: bool,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("disk error: {0}")]
    Disk(#[source] std::io::Error),

    #[error("download was cancelled")]
    Cancelled,

    #[error("invalid download identifier {0:?}")]
    InvalidIdentifier(String),
}
