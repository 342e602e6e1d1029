use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::{Response, StatusCode, Url};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::interceptor::counting_stream::CountingStream;
use crate::progress::listener::DownloadProgressListener;
use crate::progress::throttle::ThrottlePolicy;
use crate::types::DownloadError;

/// A response whose body may be tracked by a counting stream.
///
/// Progress is reported as the body is consumed, whichever way it is
/// consumed ([`bytes_stream`](Self::bytes_stream), [`bytes`](Self::bytes)
/// or [`save_to`](Self::save_to)). Dropping the response without reading
/// the body means no terminal update is ever delivered.
pub struct ProgressResponse {
    download_id: Option<String>,
    status: StatusCode,
    url: Url,
    content_length: Option<u64>,
    stream: BoxStream<'static, Result<Bytes, reqwest::Error>>,
}

impl ProgressResponse {
    pub(crate) fn tracked(
        download_id: String,
        response: Response,
        listener: Arc<dyn DownloadProgressListener>,
        throttle: ThrottlePolicy,
    ) -> Self {
        let status = response.status();
        let url = response.url().clone();
        let content_length = response.content_length();
        let stream = CountingStream::new(
            download_id.clone(),
            content_length,
            listener,
            throttle,
            response.bytes_stream(),
        )
        .boxed();
        Self {
            download_id: Some(download_id),
            status,
            url,
            content_length,
            stream,
        }
    }

    pub(crate) fn untracked(response: Response) -> Self {
        let status = response.status();
        let url = response.url().clone();
        let content_length = response.content_length();
        Self {
            download_id: None,
            status,
            url,
            content_length,
            stream: response.bytes_stream().boxed(),
        }
    }

    /// Identifier this transfer reports under, if tracked.
    pub fn download_id(&self) -> Option<&str> {
        self.download_id.as_deref()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Consume the body as a chunk stream.
    pub fn bytes_stream(self) -> impl Stream<Item = Result<Bytes, reqwest::Error>> {
        self.stream
    }

    /// Collect the whole body into memory.
    pub async fn bytes(mut self) -> Result<Vec<u8>, DownloadError> {
        let mut buf = match self.content_length {
            Some(len) => Vec::with_capacity(len as usize),
            None => Vec::new(),
        };
        while let Some(chunk) = self.stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }

    /// Stream the body to a file, returning the number of bytes written.
    ///
    /// Uses async I/O with a 256 KB write buffer to avoid blocking the
    /// runtime. The token is checked before every chunk; a cancelled
    /// transfer returns [`DownloadError::Cancelled`] and, since the body was
    /// not fully consumed, no terminal progress update is delivered.
    pub async fn save_to(
        mut self,
        path: impl AsRef<Path>,
        cancel_token: CancellationToken,
    ) -> Result<u64, DownloadError> {
        let path = path.as_ref();

        if cancel_token.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let file = tokio::fs::File::create(path)
            .await
            .map_err(DownloadError::Disk)?;
        let mut writer = tokio::io::BufWriter::with_capacity(256 * 1024, file);
        let mut written: u64 = 0;

        while let Some(chunk) = self.stream.next().await {
            if cancel_token.is_cancelled() {
                let _ = writer.flush().await;
                return Err(DownloadError::Cancelled);
            }
            let chunk = chunk?;
            writer.write_all(&chunk).await.map_err(DownloadError::Disk)?;
            written += chunk.len() as u64;
        }

        writer.flush().await.map_err(DownloadError::Disk)?;

        log::debug!(
            "[progress_response] id={:?}: wrote {} bytes to {}",
            self.download_id,
            written,
            path.display()
        );

        Ok(written)
    }
}
