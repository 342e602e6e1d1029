use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::listener::DownloadProgressListener;

/// Fan-out registry of progress listeners.
///
/// Global listeners receive every update; per-identifier listeners only see
/// their own download. The dispatcher itself implements
/// [`DownloadProgressListener`], so it can be installed directly as a
/// [`ProgressClient`](crate::interceptor::client::ProgressClient) listener.
///
/// Registration may happen concurrently with dispatch. During one `update`
/// call the registry is read-locked and listeners run in registration
/// order, globals first.
#[derive(Default)]
pub struct ProgressDispatcher {
    global: RwLock<Vec<Arc<dyn DownloadProgressListener>>>,
    by_id: RwLock<HashMap<String, Vec<Arc<dyn DownloadProgressListener>>>>,
}

impl ProgressDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every download.
    pub fn add_listener(&self, listener: Arc<dyn DownloadProgressListener>) {
        self.global.write().unwrap().push(listener);
    }

    /// Register a listener for a single download identifier.
    pub fn add_listener_for(&self, download_id: &str, listener: Arc<dyn DownloadProgressListener>) {
        self.by_id
            .write()
            .unwrap()
            .entry(download_id.to_string())
            .or_default()
            .push(listener);
    }

    /// Drop all listeners registered for `download_id`.
    ///
    /// Not called automatically on the terminal update — an identifier may
    /// be reused for a follow-up transfer.
    pub fn remove_listeners_for(&self, download_id: &str) {
        self.by_id.write().unwrap().remove(download_id);
    }

    pub fn listener_count(&self) -> usize {
        let per_id: usize = self.by_id.read().unwrap().values().map(Vec::len).sum();
        self.global.read().unwrap().len() + per_id
    }
}

impl DownloadProgressListener for ProgressDispatcher {
    fn update(&self, download_id: &str, bytes_read: u64, content_length: Option<u64>, done: bool) {
        for listener in self.global.read().unwrap().iter() {
            listener.update(download_id, bytes_read, content_length, done);
        }
        if let Some(listeners) = self.by_id.read().unwrap().get(download_id) {
            for listener in listeners {
                listener.update(download_id, bytes_read, content_length, done);
            }
        }
    }
}
