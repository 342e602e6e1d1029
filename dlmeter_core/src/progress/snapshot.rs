use serde::Serialize;

/// Point-in-time view of one tracked download.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadSnapshot {
    pub download_id: String,
    pub bytes_read: u64,
    pub content_length: Option<u64>,
    /// Bytes per second. EMA-smoothed while running, whole-transfer average
    /// once done.
    pub speed: f64,
    /// Zero when the size is unknown or the download is done.
    pub eta_secs: f64,
    pub done: bool,
}

/// Human-readable byte formatting.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
