//! Units of encoding work.

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::sync::oneshot;

use super::error::SegmentOutcome;

/// One segment of one source at one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentRequest {
    /// Absolute path of the source video.
    pub source: PathBuf,
    /// Zero-based segment index.
    pub segment_index: u64,
    /// Target vertical resolution in pixels.
    pub resolution: u32,
}

impl SegmentRequest {
    pub fn new(source: impl Into<PathBuf>, segment_index: u64, resolution: u32) -> Self {
        Self {
            source: source.into(),
            segment_index,
            resolution,
        }
    }

    /// The segment `offset` positions further along the same source.
    pub fn following(&self, offset: u64) -> Self {
        Self {
            source: self.source.clone(),
            segment_index: self.segment_index.saturating_add(offset),
            resolution: self.resolution,
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.source, self.resolution, self.segment_index)
    }
}

/// Cache file name for a segment: `<sha256(source)>.<resolution>.<index>`.
///
/// Only the triple goes into the key. Changing encoder settings does not
/// invalidate existing entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(source: &Path, resolution: u32, segment_index: u64) -> Self {
        let digest = Sha256::digest(source.to_string_lossy().as_bytes());
        Self(format!(
            "{}.{}.{}",
            hex::encode(digest),
            resolution,
            segment_index
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the outcome of a job goes.
#[derive(Debug)]
pub enum Delivery {
    /// A caller is waiting for the bytes.
    Reply(oneshot::Sender<SegmentOutcome>),
    /// Warmup: the job only populates the cache.
    FireAndForget,
}

impl Delivery {
    /// Hand the outcome over. A caller that already gave up is ignored.
    pub fn deliver(self, outcome: SegmentOutcome) {
        if let Delivery::Reply(reply) = self {
            let _ = reply.send(outcome);
        }
    }

    pub fn is_warmup(&self) -> bool {
        matches!(self, Delivery::FireAndForget)
    }
}

/// A queued encode.
#[derive(Debug)]
pub struct EncodingJob {
    pub segment: SegmentRequest,
    pub delivery: Delivery,
}

impl EncodingJob {
    /// A job whose outcome is sent to `reply`.
    pub fn reply_to(segment: SegmentRequest, reply: oneshot::Sender<SegmentOutcome>) -> Self {
        Self {
            segment,
            delivery: Delivery::Reply(reply),
        }
    }

    /// A speculative job nobody waits on.
    pub fn warmup(segment: SegmentRequest) -> Self {
        Self {
            segment,
            delivery: Delivery::FireAndForget,
        }
    }
}
