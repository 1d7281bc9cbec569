use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use segcast_av::SegmentCommand;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Directory that playlist and segment paths are resolved against
    #[serde(default = "default_media_root")]
    pub root: PathBuf,

    /// Vertical resolution served by the segment endpoint
    #[serde(default = "default_resolution")]
    pub resolution: u32,
}

fn default_media_root() -> PathBuf {
    PathBuf::from("/data")
}
fn default_resolution() -> u32 {
    480
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            resolution: default_resolution(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    /// Segment length in seconds
    #[serde(default = "default_segment_length")]
    pub segment_length: f64,

    /// Directory holding encoded segments
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Number of worker loops draining the encode queue
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Wall-clock limit for one transcoder run
    #[serde(default = "default_transcoder_timeout")]
    pub transcoder_timeout_secs: u64,

    /// How long a segment request waits for its bytes
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Warmup jobs issued after each real request
    #[serde(default = "default_prefetch_segments")]
    pub prefetch_segments: u64,

    /// Maximum concurrent submissions in the cache-check/enqueue step
    #[serde(default = "default_admission_limit")]
    pub admission_limit: usize,

    #[serde(default = "default_lookback")]
    pub lookback_secs: f64,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
}

fn default_segment_length() -> f64 {
    10.0
}
fn default_cache_root() -> PathBuf {
    PathBuf::from("/data/.segcast/segments")
}
fn default_worker_count() -> usize {
    2
}
fn default_transcoder_timeout() -> u64 {
    45
}
fn default_request_timeout() -> u64 {
    60
}
fn default_queue_capacity() -> usize {
    100
}
fn default_prefetch_segments() -> u64 {
    2
}
fn default_admission_limit() -> usize {
    64
}
fn default_lookback() -> f64 {
    5.0
}
fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_preset() -> String {
    "veryfast".to_string()
}
fn default_audio_codec() -> String {
    "aac".to_string()
}
fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            segment_length: default_segment_length(),
            cache_root: default_cache_root(),
            worker_count: default_worker_count(),
            transcoder_timeout_secs: default_transcoder_timeout(),
            request_timeout_secs: default_request_timeout(),
            queue_capacity: default_queue_capacity(),
            prefetch_segments: default_prefetch_segments(),
            admission_limit: default_admission_limit(),
            lookback_secs: default_lookback(),
            video_codec: default_video_codec(),
            preset: default_preset(),
            audio_codec: default_audio_codec(),
            pixel_format: default_pixel_format(),
        }
    }
}

impl EncoderConfig {
    pub fn transcoder_timeout(&self) -> Duration {
        Duration::from_secs(self.transcoder_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The transcoder settings derived from this section.
    pub fn segment_command(&self) -> SegmentCommand {
        SegmentCommand {
            segment_length: self.segment_length,
            lookback: self.lookback_secs,
            time_limit: self.transcoder_timeout(),
            video_codec: self.video_codec.clone(),
            preset: self.preset.clone(),
            audio_codec: self.audio_codec.clone(),
            pixel_format: self.pixel_format.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}
