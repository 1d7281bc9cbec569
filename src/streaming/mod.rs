//! On-demand HLS streaming.
//!
//! Source files are transcoded one segment at a time when a player asks for
//! them, and every encoded segment is kept on disk.
//!
//! # Routes
//!
//! - `GET /playlist/*filename` - Media playlist for a file under the media root
//! - `GET /hls/segments/*path` - MPEG-TS segment, `path` being `<id>/<n>.ts`

mod cache;
mod error;
mod hls;
mod job;
mod scheduler;

pub use cache::CacheStore;
pub use error::{SegmentError, SegmentOutcome};
pub use hls::{
    parse_segment_path, playlist, resolve_media_path, segment, segment_uri_template,
};
pub use job::{CacheKey, Delivery, EncodingJob, SegmentRequest};
pub use scheduler::{EncodingScheduler, SchedulerOptions};

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the playlist router.
pub fn playlist_router() -> Router<AppContext> {
    Router::new().route("/*filename", get(playlist))
}

/// Create the segment router.
pub fn segment_router() -> Router<AppContext> {
    Router::new().route("/*path", get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_router_creation() {
        let _router: Router<AppContext> = playlist_router();
    }

    #[test]
    fn test_segment_router_creation() {
        let _router: Router<AppContext> = segment_router();
    }
}
