use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::Stream;

use crate::progress::listener::DownloadProgressListener;
use crate::progress::throttle::ThrottlePolicy;

/// Byte-counting wrapper around a response body stream.
///
/// Chunks pass through untouched; the wrapper keeps a cumulative count and
/// reports it to the listener. Reporting rules:
///
/// - every counted chunk triggers an update with `done = false`, subject to
///   the throttle policy (the first chunk always reports);
/// - clean end of stream triggers exactly one terminal update with
///   `done = true` and the final count, after which the stream is fused;
/// - an empty body therefore produces a single `(0, len, true)` call;
/// - a stream error suppresses the terminal update — `done` only ever means
///   the body was fully consumed.
pub struct CountingStream<S> {
    inner: S,
    download_id: String,
    listener: Arc<dyn DownloadProgressListener>,
    throttle: ThrottlePolicy,
    content_length: Option<u64>,
    bytes_read: u64,
    last_emit: Option<Instant>,
    bytes_at_emit: u64,
    finished: bool,
    failed: bool,
    over_length_warned: bool,
}

impl<S> CountingStream<S> {
    pub fn new(
        download_id: String,
        content_length: Option<u64>,
        listener: Arc<dyn DownloadProgressListener>,
        throttle: ThrottlePolicy,
        inner: S,
    ) -> Self {
        Self {
            inner,
            download_id,
            listener,
            throttle,
            content_length,
            bytes_read: 0,
            last_emit: None,
            bytes_at_emit: 0,
            finished: false,
            failed: false,
            over_length_warned: false,
        }
    }

    /// Cumulative bytes counted so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn observe_chunk(&mut self, len: u64) {
        self.bytes_read += len;

        if let Some(total) = self.content_length {
            if self.bytes_read > total && !self.over_length_warned {
                log::warn!(
                    "[counting_stream] id={}: read {} bytes, exceeding the advertised content length {}",
                    self.download_id,
                    self.bytes_read,
                    total
                );
                self.over_length_warned = true;
            }
        }

        let emit = match self.last_emit {
            None => true,
            Some(last) => self
                .throttle
                .should_emit(last, self.bytes_read - self.bytes_at_emit),
        };
        if emit {
            self.listener
                .update(&self.download_id, self.bytes_read, self.content_length, false);
            self.last_emit = Some(Instant::now());
            self.bytes_at_emit = self.bytes_read;
        }
    }
}

impl<S, E> Stream for CountingStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.observe_chunk(chunk.len() as u64);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.failed = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                if !this.failed {
                    log::debug!(
                        "[counting_stream] id={}: body consumed, {} bytes total",
                        this.download_id,
                        this.bytes_read
                    );
                    this.listener
                        .update(&this.download_id, this.bytes_read, this.content_length, true);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
