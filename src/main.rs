mod cli;

use segcast::{config, server, streaming};
use segcast_av::{tools::FFMPEG, DurationProber, FfmpegDurationProber};
use segcast_media::MediaPlaylist;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting segcast server");
    tracing::info!("Media root: {:?}", config.media.root);
    tracing::info!("Segment cache: {:?}", config.encoder.cache_root);

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "segcast=trace,segcast_av=trace,tower_http=debug".to_string()
        } else {
            "segcast=debug,segcast_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => probe_file(&file, json, cli.config.as_deref()),
        Commands::Playlist { file, host } => print_playlist(&file, &host, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("segcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn prober(config: &config::Config) -> Result<FfmpegDurationProber> {
    let ffmpeg = segcast_av::get_tool_path(FFMPEG, config.tools.ffmpeg_path.as_deref())
        .context("ffmpeg is required to probe media")?;
    Ok(FfmpegDurationProber::new(ffmpeg))
}

fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let prober = prober(&config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let duration = rt.block_on(prober.probe_duration(file))?;

    let segment_length = config.encoder.segment_length;
    let segments = (duration / segment_length).ceil() as u64;

    if json {
        let report = serde_json::json!({
            "file": file.display().to_string(),
            "duration": duration,
            "segment_length": segment_length,
            "segments": segments,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let secs = duration as u64;
    let mins = secs / 60;
    let hours = mins / 60;

    println!("File: {}", file.display());
    println!(
        "Duration: {:02}:{:02}:{:02} ({:.2}s)",
        hours,
        mins % 60,
        secs % 60,
        duration
    );
    println!("Segments: {} x {}s", segments, segment_length);

    Ok(())
}

fn print_playlist(file: &str, host: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let file = file.trim_start_matches('/');
    let source = streaming::resolve_media_path(&config.media.root, file)
        .with_context(|| format!("Invalid media path: {}", file))?;
    let prober = prober(&config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let duration = rt.block_on(prober.probe_duration(&source))?;

    let uris = streaming::segment_uri_template(host, file);
    let playlist = MediaPlaylist::from_duration(duration, config.encoder.segment_length, &uris);
    print!("{}", playlist.render());

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = segcast_av::check_tools(config.tools.ffmpeg_path.as_deref());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Install it or set tools.ffmpeg_path.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Media root: {}", config.media.root.display());
            println!("  Resolution: {}p", config.media.resolution);
            println!("  Segment length: {}s", config.encoder.segment_length);
            println!("  Cache root: {}", config.encoder.cache_root.display());
            println!("  Workers: {}", config.encoder.worker_count);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
