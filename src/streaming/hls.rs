//! HLS streaming handlers.
//!
//! The playlist handler probes the source once per request and lists every
//! segment; the segment handler routes each `<id>/<n>.ts` request through the
//! shared [`EncodingScheduler`](super::EncodingScheduler).

use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::LazyLock;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use segcast_media::{MediaPlaylist, SegmentUriTemplate};

use crate::server::AppContext;

use super::error::SegmentError;
use super::job::SegmentRequest;

/// Characters escaped in a segment id. `/` is kept so ids stay readable.
const SEGMENT_ID: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static SEGMENT_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)/([0-9]+)\.ts$").expect("invalid segment path regex"));

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Serve the media playlist for `<media root>/<filename>`.
pub async fn playlist(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    let filename = filename.trim_start_matches('/');
    let Some(source) = resolve_media_path(&ctx.config.media.root, filename) else {
        return (StatusCode::BAD_REQUEST, "invalid media path").into_response();
    };

    tracing::debug!("Playlist request: {:?}", source);

    let duration = match ctx.prober.probe_duration(&source).await {
        Ok(duration) => duration,
        Err(e) => {
            tracing::error!("Could not probe {:?}: {}", source, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let uris = segment_uri_template(host, filename);
    let m3u8 =
        MediaPlaylist::from_duration(duration, ctx.config.encoder.segment_length, &uris).render();

    ([(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)], m3u8).into_response()
}

/// Serve one MPEG-TS segment, `<id>/<n>.ts`.
pub async fn segment(State(ctx): State<AppContext>, Path(path): Path<String>) -> Response {
    let Some((id, index)) = parse_segment_path(&path) else {
        return (StatusCode::BAD_REQUEST, "invalid segment path").into_response();
    };
    let Some(source) = resolve_media_path(&ctx.config.media.root, id) else {
        return (StatusCode::BAD_REQUEST, "invalid media path").into_response();
    };

    tracing::debug!("Stream request: {:?},{}", source, index);

    let request = SegmentRequest::new(source, index, ctx.config.media.resolution);
    match ctx
        .scheduler
        .fetch(request, ctx.config.encoder.request_timeout())
        .await
    {
        Ok(bytes) => ([(header::CONTENT_TYPE, SEGMENT_CONTENT_TYPE)], bytes).into_response(),
        Err(e @ SegmentError::Timeout(_)) => {
            tracing::error!("Timeout encoding {}/{}: {}", id, index, e);
            (StatusCode::GATEWAY_TIMEOUT, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!("Error encoding {}/{}: {}", id, index, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Split `<id>/<n>.ts` into the id and the segment index.
pub fn parse_segment_path(path: &str) -> Option<(&str, u64)> {
    let captures = SEGMENT_PATH_RE.captures(path)?;
    let id = captures.get(1)?.as_str().trim_start_matches('/');
    let index = captures.get(2)?.as_str().parse().ok()?;
    if id.is_empty() {
        return None;
    }
    Some((id, index))
}

/// Join a request path onto the media root.
///
/// Returns `None` for empty paths and for paths with `..` or absolute
/// components, so a request can never name a file outside the root.
pub fn resolve_media_path(root: &FsPath, relative: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in FsPath::new(relative).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (depth > 0).then_some(resolved)
}

/// URI template for the segments of `id` as seen from `host`.
pub fn segment_uri_template(host: &str, id: &str) -> SegmentUriTemplate {
    let encoded = utf8_percent_encode(id, SEGMENT_ID);
    SegmentUriTemplate::new(format!(
        "http://{host}/api/hls/segments/{encoded}/{{index}}.ts"
    ))
}
