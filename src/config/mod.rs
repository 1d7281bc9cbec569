mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Shortest accepted segment length in seconds.
const MIN_SEGMENT_LENGTH: f64 = 1.0;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./segcast.toml",
        "~/.config/segcast/config.toml",
        "/etc/segcast/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.media.resolution == 0 {
        anyhow::bail!("Media resolution must be greater than 0");
    }

    if !config.media.root.exists() {
        tracing::warn!("Media root does not exist: {:?}", config.media.root);
    }

    let encoder = &config.encoder;
    if !encoder.segment_length.is_finite() || encoder.segment_length < MIN_SEGMENT_LENGTH {
        anyhow::bail!(
            "Segment length must be a finite number of at least {}s, got {}",
            MIN_SEGMENT_LENGTH,
            encoder.segment_length
        );
    }
    if encoder.lookback_secs < 0.0 {
        anyhow::bail!("Look-back cannot be negative");
    }
    if encoder.worker_count == 0 {
        anyhow::bail!("Encoder needs at least one worker");
    }
    if encoder.queue_capacity == 0 {
        anyhow::bail!("Encoder queue capacity cannot be 0");
    }
    if encoder.admission_limit == 0 {
        anyhow::bail!("Encoder admission limit cannot be 0");
    }
    if encoder.transcoder_timeout_secs == 0 || encoder.request_timeout_secs == 0 {
        anyhow::bail!("Encoder timeouts must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.media.resolution, 480);
        assert_eq!(config.encoder.segment_length, 10.0);
        assert_eq!(config.encoder.worker_count, 2);
        assert_eq!(config.encoder.prefetch_segments, 2);
        assert_eq!(config.encoder.transcoder_timeout().as_secs(), 45);
        assert_eq!(config.encoder.request_timeout().as_secs(), 60);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
[encoder]
worker_count = 4
cache_root = "/tmp/segments"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.encoder.worker_count, 4);
        assert_eq!(config.encoder.cache_root, Path::new("/tmp/segments"));
        assert_eq!(config.encoder.queue_capacity, 100);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_segment_command_follows_config() {
        let mut encoder = EncoderConfig::default();
        encoder.segment_length = 6.0;
        encoder.transcoder_timeout_secs = 20;
        encoder.audio_codec = "libfdk_aac".to_string();

        let command = encoder.segment_command();
        assert_eq!(command.segment_length, 6.0);
        assert_eq!(command.time_limit.as_secs(), 20);
        assert_eq!(command.audio_codec, "libfdk_aac");
        assert_eq!(command.lookback, 5.0);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let file = write_config("[encoder]\nworker_count = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("worker"));
    }

    #[test]
    fn test_rejects_non_positive_segment_length() {
        let mut config = Config::default();
        config.encoder.segment_length = 0.0;
        assert!(validate_config(&config).is_err());

        config.encoder.segment_length = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_unbounded_segment_length() {
        let mut config = Config::default();
        for length in [f64::INFINITY, 1e-12, 0.5] {
            config.encoder.segment_length = length;
            let err = validate_config(&config).unwrap_err();
            assert!(err.to_string().contains("Segment length"), "{length}");
        }

        config.encoder.segment_length = 1.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("[server\nport = 1");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
