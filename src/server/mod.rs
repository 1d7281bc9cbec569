use crate::config::Config;
use crate::streaming::{self, CacheStore, EncodingScheduler, SchedulerOptions};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use segcast_av::{
    get_tool_path, tools::FFMPEG, DurationProber, FfmpegDurationProber, FfmpegSegmentEncoder,
    SegmentEncoder,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// The one scheduler for the configured cache root
    pub scheduler: EncodingScheduler,
    pub prober: Arc<dyn DurationProber>,
}

impl AppContext {
    /// Build the context around ffmpeg, resolved from config or `PATH`.
    ///
    /// Spawns the encoding workers, so it must run inside a Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let ffmpeg = get_tool_path(FFMPEG, config.tools.ffmpeg_path.as_deref())
            .context("ffmpeg is required to serve segments")?;
        tracing::info!("Using ffmpeg at {:?}", ffmpeg);

        let encoder = Arc::new(FfmpegSegmentEncoder::new(
            ffmpeg.clone(),
            config.encoder.segment_command(),
        ));
        let prober = Arc::new(FfmpegDurationProber::new(ffmpeg));

        Ok(Self::with_backends(config, encoder, prober))
    }

    /// Build the context around arbitrary encoder and prober implementations.
    pub fn with_backends(
        config: Config,
        encoder: Arc<dyn SegmentEncoder>,
        prober: Arc<dyn DurationProber>,
    ) -> Self {
        let scheduler = EncodingScheduler::new(
            CacheStore::new(config.encoder.cache_root.clone()),
            encoder,
            SchedulerOptions::from(&config.encoder),
        );

        Self {
            config: Arc::new(config),
            scheduler,
            prober,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .nest("/api/playlist", streaming::playlist_router())
        .nest("/api/hls/segments", streaming::segment_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn index() -> &'static str {
    "Welcome!\n"
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config)?;
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
