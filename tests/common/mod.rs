//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a full [`AppContext`] in a temporary
//! directory around [`FakeEncoder`] and [`FakeProber`], so no ffmpeg is
//! needed.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use segcast::config::Config;
use segcast::server::AppContext;
use segcast::streaming::{EncodingScheduler, SegmentRequest};
use segcast_av::{DurationProber, Error, SegmentEncoder};
use tempfile::TempDir;

/// Encoder that returns `"<resolution>:<index>"` after an optional delay.
#[derive(Default)]
pub struct FakeEncoder {
    delay: Duration,
    failing: HashSet<u64>,
    calls: Mutex<HashMap<u64, usize>>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every encode of `segment_index` fail.
    pub fn failing_on(mut self, segment_index: u64) -> Self {
        self.failing.insert(segment_index);
        self
    }

    /// How many times `segment_index` was encoded.
    pub fn calls(&self, segment_index: u64) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&segment_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

/// What [`FakeEncoder`] produces for a segment.
pub fn fake_segment(resolution: u32, segment_index: u64) -> Bytes {
    Bytes::from(format!("{resolution}:{segment_index}"))
}

#[async_trait]
impl SegmentEncoder for FakeEncoder {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn encode_segment(
        &self,
        _source: &Path,
        segment_index: u64,
        resolution: u32,
    ) -> segcast_av::Result<Bytes> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(segment_index)
            .or_insert(0) += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.contains(&segment_index) {
            return Err(Error::tool_failed("fake", "exit status: 1"));
        }
        Ok(fake_segment(resolution, segment_index))
    }
}

/// Prober that reports a fixed duration, or fails.
pub struct FakeProber {
    duration: Option<f64>,
}

impl FakeProber {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: Some(duration),
        }
    }

    pub fn failing() -> Self {
        Self { duration: None }
    }
}

#[async_trait]
impl DurationProber for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe_duration(&self, _source: &Path) -> segcast_av::Result<f64> {
        self.duration
            .ok_or_else(|| Error::tool_not_found("ffmpeg"))
    }
}

/// An [`AppContext`] rooted in a temporary directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub encoder: Arc<FakeEncoder>,
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(FakeEncoder::new(), FakeProber::new(25.0), |_| {})
    }

    /// Build a harness, letting `configure` adjust the config first.
    ///
    /// The media root and cache root point into the temporary directory
    /// unless `configure` changes them.
    pub fn build(
        encoder: FakeEncoder,
        prober: FakeProber,
        configure: impl FnOnce(&mut Config),
    ) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let mut config = Config::default();
        config.media.root = dir.path().join("media");
        config.encoder.cache_root = dir.path().join("cache");
        configure(&mut config);

        let encoder = Arc::new(encoder);
        let ctx = AppContext::with_backends(config, encoder.clone(), Arc::new(prober));

        Self { ctx, encoder, dir }
    }

    pub fn scheduler(&self) -> &EncodingScheduler {
        &self.ctx.scheduler
    }

    pub fn media_root(&self) -> PathBuf {
        self.ctx.config.media.root.clone()
    }

    /// A request for `segment_index` of `movie.mkv` at the configured resolution.
    pub fn request(&self, segment_index: u64) -> SegmentRequest {
        SegmentRequest::new(
            self.media_root().join("movie.mkv"),
            segment_index,
            self.ctx.config.media.resolution,
        )
    }

    /// The cached bytes for a request, if any.
    pub async fn cached(&self, request: &SegmentRequest) -> Option<Bytes> {
        self.scheduler()
            .cache()
            .lookup(&request.cache_key())
            .await
            .expect("cache lookup failed")
    }

    /// Wait until nothing is queued, encoding or being stored.
    pub async fn wait_idle(&self) {
        for _ in 0..500 {
            if self.scheduler().in_flight() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scheduler did not go idle");
    }
}
