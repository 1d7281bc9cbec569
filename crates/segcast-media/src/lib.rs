//! Segcast-Media: HLS playlist generation.
//!
//! Segments are produced on demand, so a playlist is derived from nothing more
//! than the source duration and the fixed segment length. Every segment is
//! `segment_length` seconds long except the last, which carries the
//! remainder.
//!
//! # Modules
//!
//! - `hls` - HLS media playlist model and m3u8 rendering

pub mod hls;

pub use hls::{MediaPlaylist, SegmentUriTemplate};
