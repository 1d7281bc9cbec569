//! ffmpeg argument synthesis for a single HLS segment.
//!
//! This is the only place that knows ffmpeg's command-line surface for
//! transcoding. Segment `n` covers `[n * L, (n + 1) * L)` of the source,
//! where `L` is the segment length.
//!
//! For every segment after the first, ffmpeg is asked to seek `lookback`
//! seconds before the segment start (input-side `-ss`) and to discard that
//! much decoded output again (output-side `-ss`). The decoder therefore
//! starts on an earlier keyframe and the first emitted frame lands exactly on
//! the segment boundary.

use std::path::Path;
use std::time::Duration;

/// Default segment length in seconds.
pub const DEFAULT_SEGMENT_LENGTH: f64 = 10.0;

/// Default decoder look-back in seconds.
pub const DEFAULT_LOOKBACK: f64 = 5.0;

/// Default wall-clock limit for one transcode.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(45);

/// Encoding parameters shared by every segment of every source.
#[derive(Debug, Clone)]
pub struct SegmentCommand {
    /// Segment length in seconds.
    pub segment_length: f64,
    /// Seconds decoded before the segment start and then dropped.
    pub lookback: f64,
    /// Hard limit handed to ffmpeg via `-timelimit`.
    pub time_limit: Duration,
    /// Video encoder, e.g. `libx264`.
    pub video_codec: String,
    /// Encoder preset.
    pub preset: String,
    /// Audio encoder, e.g. `aac`.
    pub audio_codec: String,
    /// Output pixel format.
    pub pixel_format: String,
}

impl Default for SegmentCommand {
    fn default() -> Self {
        Self {
            segment_length: DEFAULT_SEGMENT_LENGTH,
            lookback: DEFAULT_LOOKBACK,
            time_limit: DEFAULT_TIME_LIMIT,
            video_codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            audio_codec: "aac".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

/// Where ffmpeg should seek for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekWindow {
    /// Nominal segment start in the source timeline.
    pub start: f64,
    /// Input-side seek position (`start - lookback`).
    pub input_seek: f64,
    /// Output-side trim applied after decoding (`lookback`).
    pub output_trim: f64,
}

impl SegmentCommand {
    /// Compute the seek window for a segment.
    ///
    /// Segment 0 never looks back. Later segments look back by `lookback`
    /// seconds, clamped so the input seek never goes negative.
    pub fn seek_window(&self, segment_index: u64) -> SeekWindow {
        let start = segment_index as f64 * self.segment_length;
        let lookback = if segment_index == 0 {
            0.0
        } else {
            self.lookback.min(start).max(0.0)
        };

        SeekWindow {
            start,
            input_seek: start - lookback,
            output_trim: lookback,
        }
    }

    /// Build the full ffmpeg argument list for one segment.
    ///
    /// The result is one MPEG-TS segment of `segment_length` seconds written
    /// to standard output, scaled to `resolution` pixels high, with keyframes
    /// forced every `segment_length` seconds and timestamps offset to the
    /// segment's place in the source timeline.
    pub fn build_args(&self, source: &Path, segment_index: u64, resolution: u32) -> Vec<String> {
        let window = self.seek_window(segment_index);
        let length = self.segment_length;

        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-timelimit".to_string(),
            self.time_limit.as_secs().max(1).to_string(),
            "-ss".to_string(),
            format!("{:.2}", window.input_seek),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-ss".to_string(),
            format!("{:.2}", window.output_trim),
            "-t".to_string(),
            format!("{:.2}", length),
            "-vf".to_string(),
            format!("scale=-2:{resolution}"),
            "-vcodec".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-acodec".to_string(),
            self.audio_codec.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-force_key_frames".to_string(),
            format!("expr:gte(t,n_forced*{:.2})", length),
            "-f".to_string(),
            "mpegts".to_string(),
            "-output_ts_offset".to_string(),
            format!("{:.2}", window.start),
            "pipe:1".to_string(),
        ]
    }
}
