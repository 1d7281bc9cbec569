//! HLS playlist structures.

use std::fmt::Write;

/// Placeholder substituted with the zero-based segment index.
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// URI pattern for segments, e.g.
/// `http://host/api/hls/segments/movie.mkv/{index}.ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentUriTemplate(String);

impl SegmentUriTemplate {
    /// Create a template. `{index}` is replaced by the segment index.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// URI of segment `index`.
    pub fn uri(&self, index: u64) -> String {
        self.0.replace(INDEX_PLACEHOLDER, &index.to_string())
    }
}

/// Media playlist for a single rendition.
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    /// Protocol version.
    pub version: u8,
    /// Target duration in seconds.
    pub target_duration: u32,
    /// Media sequence number.
    pub media_sequence: u32,
    /// Emit `#EXT-X-ALLOW-CACHE:YES`.
    pub allow_cache: bool,
    /// Emit a discontinuity marker ahead of the first segment.
    pub discontinuity: bool,
    /// Segment entries.
    pub segments: Vec<SegmentEntry>,
    /// Whether this is an ended playlist.
    pub ended: bool,
}

impl MediaPlaylist {
    /// Create a new VOD playlist.
    pub fn vod() -> Self {
        Self {
            version: 3,
            target_duration: 10,
            media_sequence: 0,
            allow_cache: true,
            discontinuity: true,
            segments: Vec::new(),
            ended: true,
        }
    }

    /// Lay `duration` seconds out as consecutive segments of
    /// `segment_length` seconds.
    ///
    /// Every segment declares `segment_length` except the last, which
    /// declares the remainder. A non-positive duration or segment length
    /// yields a playlist without segments.
    pub fn from_duration(duration: f64, segment_length: f64, uris: &SegmentUriTemplate) -> Self {
        let mut playlist = Self::vod();
        playlist.target_duration = segment_length.round().max(0.0) as u32;

        if segment_length <= 0.0 {
            return playlist;
        }

        let mut leftover = duration;
        let mut index = 0u64;
        while leftover > 0.0 {
            playlist.segments.push(SegmentEntry {
                duration: leftover.min(segment_length),
                uri: uris.uri(index),
            });
            index += 1;
            leftover -= segment_length;
        }

        playlist
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        let mut out = String::new();

        writeln!(out, "#EXTM3U").unwrap();
        writeln!(out, "#EXT-X-VERSION:{}", self.version).unwrap();
        writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence).unwrap();
        if self.allow_cache {
            writeln!(out, "#EXT-X-ALLOW-CACHE:YES").unwrap();
        }
        writeln!(out, "#EXT-X-TARGETDURATION:{}", self.target_duration).unwrap();
        if self.discontinuity {
            writeln!(out, "#EXT-X-DISCONTINUITY").unwrap();
        }
        writeln!(out, "#EXT-X-PLAYLIST-TYPE:VOD").unwrap();

        for segment in &self.segments {
            writeln!(out, "#EXTINF:{:.6},", segment.duration).unwrap();
            writeln!(out, "{}", segment.uri).unwrap();
        }

        if self.ended {
            writeln!(out, "#EXT-X-ENDLIST").unwrap();
        }

        out
    }
}

impl Default for MediaPlaylist {
    fn default() -> Self {
        Self::vod()
    }
}

/// A segment entry in the playlist.
#[derive(Debug, Clone)]
pub struct SegmentEntry {
    /// Duration in seconds.
    pub duration: f64,
    /// Segment URI.
    pub uri: String,
}
