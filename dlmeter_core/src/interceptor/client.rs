use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::{Client, Request};
use uuid::Uuid;

use crate::interceptor::response::ProgressResponse;
use crate::progress::listener::DownloadProgressListener;
use crate::progress::throttle::ThrottlePolicy;
use crate::types::DownloadError;

/// Request header naming the download a transfer belongs to.
///
/// Requests carrying this header get their response body wrapped in a
/// counting stream; requests without it pass through untracked. The header
/// is forwarded to the server unmodified.
pub const DOWNLOAD_IDENTIFIER_HEADER: &str = "download-identifier";

/// HTTP client wrapper that intercepts response bodies and reports
/// per-download byte counts to a listener.
///
/// One client serves any number of concurrent downloads; the identifier
/// header keeps their progress streams apart on a shared listener.
pub struct ProgressClient {
    client: Client,
    listener: Arc<dyn DownloadProgressListener>,
    throttle: ThrottlePolicy,
}

pub struct ProgressClientBuilder {
    client: Option<Client>,
    listener: Arc<dyn DownloadProgressListener>,
    throttle: ThrottlePolicy,
}

impl ProgressClient {
    /// Client with the default tuned HTTP stack and per-chunk reporting.
    pub fn new(listener: Arc<dyn DownloadProgressListener>) -> Self {
        Self::builder(listener).build()
    }

    pub fn builder(listener: Arc<dyn DownloadProgressListener>) -> ProgressClientBuilder {
        ProgressClientBuilder {
            client: None,
            listener,
            throttle: ThrottlePolicy::default(),
        }
    }

    /// Execute an arbitrary request.
    ///
    /// If the request carries [`DOWNLOAD_IDENTIFIER_HEADER`] (non-empty),
    /// the response body is tracked under that identifier; otherwise the
    /// response passes through untracked.
    pub async fn execute(&self, request: Request) -> Result<ProgressResponse, DownloadError> {
        let download_id = request
            .headers()
            .get(DOWNLOAD_IDENTIFIER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let response = self.client.execute(request).await?;

        Ok(match download_id {
            Some(id) => {
                log::debug!(
                    "[progress_client] id={}: tracking response, content_length={:?}",
                    id,
                    response.content_length()
                );
                ProgressResponse::tracked(id, response, Arc::clone(&self.listener), self.throttle)
            }
            None => ProgressResponse::untracked(response),
        })
    }

    /// GET `url` tracked under `download_id`.
    pub async fn download_with_id(
        &self,
        url: &str,
        download_id: &str,
    ) -> Result<ProgressResponse, DownloadError> {
        if download_id.is_empty() {
            return Err(DownloadError::InvalidIdentifier(String::new()));
        }
        let value = HeaderValue::from_str(download_id)
            .map_err(|_| DownloadError::InvalidIdentifier(download_id.to_string()))?;
        let request = self
            .client
            .get(url)
            .header(DOWNLOAD_IDENTIFIER_HEADER, value)
            .build()?;
        self.execute(request).await
    }

    /// GET `url` tracked under a freshly generated identifier.
    pub async fn download(&self, url: &str) -> Result<ProgressResponse, DownloadError> {
        let download_id = Uuid::new_v4().to_string();
        self.download_with_id(url, &download_id).await
    }
}

impl ProgressClientBuilder {
    /// Use a caller-configured `reqwest::Client` instead of the default.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn throttle(mut self, throttle: ThrottlePolicy) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn build(self) -> ProgressClient {
        let client = self.client.unwrap_or_else(|| {
            // Tuned HTTP client: connect timeout, TCP optimizations
            Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .tcp_nodelay(true)
                .build()
                .expect("failed to build HTTP client")
        });
        ProgressClient {
            client,
            listener: self.listener,
            throttle: self.throttle,
        }
    }
}
