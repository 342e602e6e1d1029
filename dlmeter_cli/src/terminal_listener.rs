use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use dlmeter_core::progress::listener::DownloadProgressListener;
use dlmeter_core::progress::snapshot::format_bytes;

/// Renders download progress as indicatif terminal bars.
///
/// One `ProgressBar` is created per download identifier, lazily on its
/// first update. All bars live under a shared `MultiProgress` so they
/// render cleanly.
pub struct TerminalProgressListener {
    multi: MultiProgress,
    /// download_id → ProgressBar
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl TerminalProgressListener {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn make_bar(&self, download_id: &str, content_length: Option<u64>) -> ProgressBar {
        let pb = match content_length {
            Some(total) => {
                let style = ProgressStyle::with_template(
                    "[{bar:30.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}) ETA {eta} — {msg}",
                )
                .unwrap()
                .progress_chars("=>-");
                let pb = self.multi.add(ProgressBar::new(total.max(1)));
                pb.set_style(style);
                pb
            }
            None => {
                // Size unknown — spinner with a running byte count.
                let style = ProgressStyle::with_template(
                    "{spinner} {bytes} ({binary_bytes_per_sec}) — {msg}",
                )
                .unwrap();
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(style);
                pb
            }
        };
        pb.set_message(download_id.to_string());
        pb
    }

    /// Abandon the download's bar with an error message.
    pub fn fail(&self, download_id: &str, error: &str) {
        let bars = self.bars.lock().unwrap();
        match bars.get(download_id) {
            Some(pb) => pb.abandon_with_message(format!("{} — failed: {}", download_id, error)),
            // Failed before the first update, no bar to abandon
            None => eprintln!("{}: {}", download_id, error),
        }
    }
}

impl DownloadProgressListener for TerminalProgressListener {
    fn update(&self, download_id: &str, bytes_read: u64, content_length: Option<u64>, done: bool) {
        let mut bars = self.bars.lock().unwrap();
        let pb = bars
            .entry(download_id.to_string())
            .or_insert_with(|| self.make_bar(download_id, content_length));

        if let Some(total) = content_length {
            pb.set_length(total.max(1));
        }
        pb.set_position(bytes_read);

        if done {
            pb.finish_with_message(format!("{} — {} done", download_id, format_bytes(bytes_read)));
        }
    }
}
