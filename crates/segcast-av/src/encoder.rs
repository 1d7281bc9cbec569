//! Segment transcoding through an external encoder.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::command::ToolCommand;
use crate::segment::SegmentCommand;
use crate::{Error, Result};

/// Produces the encoded bytes of one segment of a source file.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait SegmentEncoder: Send + Sync {
    /// Human-readable name identifying this encoder implementation.
    fn name(&self) -> &'static str;

    /// Encode segment `segment_index` of `source` at `resolution` pixels high.
    async fn encode_segment(
        &self,
        source: &Path,
        segment_index: u64,
        resolution: u32,
    ) -> Result<Bytes>;
}

/// [`SegmentEncoder`] backed by an ffmpeg subprocess per segment.
#[derive(Debug, Clone)]
pub struct FfmpegSegmentEncoder {
    ffmpeg: PathBuf,
    command: SegmentCommand,
}

impl FfmpegSegmentEncoder {
    /// Create an encoder for the given ffmpeg executable and settings.
    pub fn new(ffmpeg: PathBuf, command: SegmentCommand) -> Self {
        Self { ffmpeg, command }
    }
}

#[async_trait]
impl SegmentEncoder for FfmpegSegmentEncoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn encode_segment(
        &self,
        source: &Path,
        segment_index: u64,
        resolution: u32,
    ) -> Result<Bytes> {
        tracing::debug!("Encoding {:?}:{}", source, segment_index);

        let output = ToolCommand::new(self.ffmpeg.clone())
            .args(self.command.build_args(source, segment_index, resolution))
            .timeout(self.command.time_limit)
            .execute()
            .await?;

        if output.stdout.is_empty() {
            return Err(Error::tool_failed(
                "ffmpeg",
                format!("no output for segment {segment_index} of {}", source.display()),
            ));
        }

        Ok(output.stdout)
    }
}
