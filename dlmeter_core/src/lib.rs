pub mod interceptor;
pub mod progress;
pub mod types;

pub use interceptor::client::{ProgressClient, DOWNLOAD_IDENTIFIER_HEADER};
pub use progress::listener::DownloadProgressListener;
pub use types::{DownloadError, ProgressUpdate};
