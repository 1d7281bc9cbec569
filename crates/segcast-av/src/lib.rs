//! # segcast-av
//!
//! The external-tool side of segcast: everything that knows how to talk to
//! ffmpeg.
//!
//! This crate provides:
//!
//! - **Command execution** ([`ToolCommand`]) -- async builder with a
//!   wall-clock limit for running external processes.
//! - **Tool discovery** ([`tools`]) -- locate ffmpeg on `PATH` or at a
//!   configured location.
//! - **Timecode parsing** ([`parse_timecode`]) -- `HH:MM:SS.ff` to seconds.
//! - **Duration probing** ([`DurationProber`], [`FfmpegDurationProber`]).
//! - **Segment command synthesis** ([`SegmentCommand`]) -- the ffmpeg
//!   arguments for one HLS segment.
//! - **Segment encoding** ([`SegmentEncoder`], [`FfmpegSegmentEncoder`]).

pub mod command;
pub mod encoder;
mod error;
pub mod probe;
pub mod segment;
pub mod timecode;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use encoder::{FfmpegSegmentEncoder, SegmentEncoder};
pub use error::{Error, Result};
pub use probe::{parse_duration_report, DurationProber, FfmpegDurationProber};
pub use segment::{SeekWindow, SegmentCommand};
pub use timecode::parse_timecode;
pub use tools::{check_tools, get_tool_path, ToolInfo};
