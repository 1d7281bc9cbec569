//! External tool detection.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the transcoder binary segcast drives.
pub const FFMPEG: &str = "ffmpeg";

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available using a custom version argument.
pub fn check_tool_with_arg(program: &Path, version_arg: &str) -> ToolInfo {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string());

    match Command::new(program).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            ToolInfo {
                name,
                available: true,
                version,
                path: which::which(program).ok(),
            }
        }
        _ => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool segcast needs.
///
/// `ffmpeg_path` is the configured override, if any.
pub fn check_tools(ffmpeg_path: Option<&Path>) -> Vec<ToolInfo> {
    let ffmpeg = ffmpeg_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(FFMPEG));
    vec![check_tool_with_arg(&ffmpeg, "-version")]
}

/// Get the path to a tool, preferring a configured path over `PATH` lookup.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if neither the configured path exists nor
/// the tool can be found on `PATH`.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            "Configured {} path {:?} does not exist, falling back to PATH",
            name,
            path
        );
    }

    which::which(name).map_err(|_| Error::tool_not_found(name))
}
