use std::time::{Duration, Instant};

/// Sampling policy for intermediate progress updates.
///
/// The first update of a download and the terminal (`done = true`) update
/// are always delivered; the policy only gates the updates in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePolicy {
    /// Report every chunk.
    EveryChunk,
    /// Suppress updates until this much time has passed since the last
    /// delivered one.
    Interval(Duration),
    /// Suppress updates until at least this many bytes have accumulated
    /// since the last delivered one.
    Bytes(u64),
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        ThrottlePolicy::EveryChunk
    }
}

impl ThrottlePolicy {
    /// Decide whether an intermediate update should be delivered.
    ///
    /// `last_emit` is the instant of the last delivered update and
    /// `bytes_since_emit` the bytes counted since then (including the
    /// current chunk).
    pub(crate) fn should_emit(&self, last_emit: Instant, bytes_since_emit: u64) -> bool {
        match *self {
            ThrottlePolicy::EveryChunk => true,
            ThrottlePolicy::Interval(min) => last_emit.elapsed() >= min,
            ThrottlePolicy::Bytes(min) => bytes_since_emit >= min,
        }
    }
}
