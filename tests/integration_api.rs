//! API integration tests
//!
//! Tests for HTTP endpoints using axum's test utilities.

mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{fake_segment, FakeEncoder, FakeProber, TestHarness};
use http_body_util::BodyExt;
use segcast::server::create_router;
use tower::ServiceExt;

/// Helper to get response body as string
async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::HOST, "media.local:8001")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_index_endpoint() {
    let h = TestHarness::new();
    let response = create_router(h.ctx.clone()).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "Welcome!\n");
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = TestHarness::new();
    let response = create_router(h.ctx.clone())
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_playlist_lists_every_segment() {
    let h = TestHarness::new();
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/playlist/movie.mkv"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.apple.mpegurl"
    );

    let body = body_to_string(response.into_body()).await;
    assert!(body.starts_with("#EXTM3U\n"));
    assert!(body.contains("#EXT-X-TARGETDURATION:10\n"));
    assert_eq!(body.matches("#EXTINF:").count(), 3);
    assert!(body.contains("#EXTINF:5.000000,\n"));
    assert!(body.contains("http://media.local:8001/api/hls/segments/movie.mkv/0.ts\n"));
    assert!(body.contains("http://media.local:8001/api/hls/segments/movie.mkv/2.ts\n"));
    assert!(body.ends_with("#EXT-X-ENDLIST\n"));
}

#[tokio::test]
async fn test_playlist_encodes_segment_ids() {
    let h = TestHarness::new();
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/playlist/shows/My%20Show.mkv"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("/api/hls/segments/shows/My%20Show.mkv/0.ts"));
}

#[tokio::test]
async fn test_playlist_probe_failure_is_500() {
    let h = TestHarness::build(FakeEncoder::new(), FakeProber::failing(), |_| {});
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/playlist/movie.mkv"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("ffmpeg"));
}

#[tokio::test]
async fn test_playlist_allows_any_origin() {
    let h = TestHarness::new();
    let request = Request::get("/api/playlist/movie.mkv")
        .header(header::HOST, "media.local")
        .header(header::ORIGIN, "http://player.example")
        .body(Body::empty())
        .unwrap();

    let response = create_router(h.ctx.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_segment_returns_transport_stream() {
    let h = TestHarness::new();
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/hls/segments/movie.mkv/2.ts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp2t"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, fake_segment(480, 2));

    h.wait_idle().await;
    assert_eq!(h.cached(&h.request(2)).await, Some(fake_segment(480, 2)));
}

#[tokio::test]
async fn test_segment_uses_configured_resolution() {
    let h = TestHarness::build(FakeEncoder::new(), FakeProber::new(25.0), |c| {
        c.media.resolution = 720;
    });
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/hls/segments/movie.mkv/0.ts"))
        .await
        .unwrap();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, fake_segment(720, 0));
}

#[tokio::test]
async fn test_segment_with_malformed_path_is_400() {
    let h = TestHarness::new();

    for uri in [
        "/api/hls/segments/movie.mkv/abc.ts",
        "/api/hls/segments/movie.mkv/1.m4s",
        "/api/hls/segments/3.ts",
    ] {
        let response = create_router(h.ctx.clone()).oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
    assert_eq!(h.encoder.total_calls(), 0);
}

#[tokio::test]
async fn test_segment_outside_media_root_is_400() {
    let h = TestHarness::new();
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/hls/segments/..%2F..%2Fetc%2Fpasswd/0.ts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.encoder.total_calls(), 0);
}

#[tokio::test]
async fn test_segment_transcode_failure_is_500() {
    let h = TestHarness::build(
        FakeEncoder::new().failing_on(0),
        FakeProber::new(25.0),
        |_| {},
    );
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/hls/segments/movie.mkv/0.ts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("transcode failed"));
}

#[tokio::test]
async fn test_segment_timeout_is_504() {
    let h = TestHarness::build(
        FakeEncoder::new().with_delay(Duration::from_secs(3)),
        FakeProber::new(25.0),
        |c| c.encoder.request_timeout_secs = 1,
    );
    let response = create_router(h.ctx.clone())
        .oneshot(get("/api/hls/segments/movie.mkv/0.ts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}
