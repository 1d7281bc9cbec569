use std::time::Duration;

use bytes::Bytes;

/// What a segment request resolves to.
pub type SegmentOutcome = std::result::Result<Bytes, SegmentError>;

/// Why a segment could not be delivered.
///
/// Cloneable so that a single outcome can be handed to every request that
/// attached to the same in-flight encode.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SegmentError {
    /// Reading the segment cache failed for a reason other than a miss.
    #[error("segment cache error: {0}")]
    Cache(String),

    /// The transcoder failed, timed out or produced nothing.
    #[error("transcode failed: {0}")]
    Transcode(String),

    /// The caller stopped waiting. The encode itself keeps running.
    #[error("no segment after {0:?}")]
    Timeout(Duration),

    /// The scheduler is no longer accepting work.
    #[error("encoding queue is closed")]
    QueueClosed,

    /// A prefetched encode was dropped because the queue was full.
    #[error("encoding queue is full")]
    QueueFull,
}

impl From<segcast_av::Error> for SegmentError {
    fn from(err: segcast_av::Error) -> Self {
        Self::Transcode(err.to_string())
    }
}

impl From<std::io::Error> for SegmentError {
    fn from(err: std::io::Error) -> Self {
        Self::Cache(err.to_string())
    }
}
