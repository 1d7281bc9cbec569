//! Source duration probing.
//!
//! ffmpeg prints a `Duration: HH:MM:SS.ff,` line for every input it opens.
//! Probing runs `ffmpeg -hide_banner -i <file>` with no output, which makes
//! ffmpeg exit non-zero after printing its report; the exit status is
//! therefore ignored and only the report is inspected.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::command::ToolCommand;
use crate::timecode::parse_timecode;
use crate::Result;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: (\d{2}:\d{2}:\d{2}\.\d{2}),").expect("invalid duration regex")
});

/// Default probe timeout.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can tell how long a source file plays for.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait DurationProber: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Duration of `source` in seconds.
    ///
    /// A source whose duration cannot be determined reports `0.0`; only a
    /// failure to run the probe at all is an error.
    async fn probe_duration(&self, source: &Path) -> Result<f64>;
}

/// [`DurationProber`] that shells out to ffmpeg.
///
/// Spawns one process per call and caches nothing.
#[derive(Debug, Clone)]
pub struct FfmpegDurationProber {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegDurationProber {
    /// Create a prober for the given ffmpeg executable.
    pub fn new(ffmpeg: PathBuf) -> Self {
        Self {
            ffmpeg,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DurationProber for FfmpegDurationProber {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn probe_duration(&self, source: &Path) -> Result<f64> {
        let output = ToolCommand::new(self.ffmpeg.clone())
            .args(["-hide_banner", "-i"])
            .arg(source.to_string_lossy().as_ref())
            .timeout(self.timeout)
            .run()
            .await?;

        let report = output.combined_text();
        match parse_duration_report(&report) {
            Some(seconds) => Ok(seconds),
            None => {
                tracing::warn!("No duration found in ffmpeg report for {:?}", source);
                Ok(0.0)
            }
        }
    }
}

/// Extract the first `Duration: HH:MM:SS.ff,` header from an ffmpeg report.
pub fn parse_duration_report(report: &str) -> Option<f64> {
    DURATION_RE
        .captures(report)
        .map(|caps| parse_timecode(&caps[1]))
}
