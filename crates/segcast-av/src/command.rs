//! Builder for executing external tool commands with a wall-clock limit.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use bytes::Bytes;
use tokio::process::Command;

use crate::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output, untouched (may be binary media).
    pub stdout: Bytes,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Standard output and standard error as one lossy UTF-8 report, in the
    /// order a terminal would usually show them.
    pub fn combined_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        text.push_str(&self.stderr);
        text
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// The child is spawned with `kill_on_drop`, so when the timeout elapses the
/// pending wait is dropped and the process is killed rather than left behind.
///
/// # Example
///
/// ```no_run
/// use segcast_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> segcast_av::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-i")
///     .arg("/data/movie.mkv")
///     .run()
///     .await?;
/// println!("{}", output.combined_text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command and capture its output without judging the exit
    /// status.
    ///
    /// Useful for tools such as `ffmpeg -i <file>` that report what we need
    /// and then exit non-zero because no output was requested.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program does not exist.
    /// - [`Error::ToolFailed`] if spawning or waiting on the process fails.
    /// - [`Error::Timeout`] if the process outlives the timeout; it is killed.
    pub async fn run(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();

        tracing::debug!("Executing: {} {:?}", self.program.display(), self.args);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(program_name.clone())
                } else {
                    Error::tool_failed(program_name.clone(), format!("failed to spawn: {e}"))
                }
            })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolOutput {
                status: output.status,
                stdout: Bytes::from(output.stdout),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }),
            Ok(Err(e)) => Err(Error::tool_failed(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            // Dropping the wait future drops the child, which kills it.
            Err(_elapsed) => Err(Error::timeout(program_name, self.timeout)),
        }
    }

    /// Run the command and require a successful exit status.
    ///
    /// # Errors
    ///
    /// Everything [`run`](Self::run) returns, plus [`Error::ToolFailed`] when
    /// the process exits with a non-zero status (message includes stderr).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let output = self.run().await?;

        if !output.status.success() {
            return Err(Error::tool_failed(
                self.program_name(),
                format!(
                    "exited with status {}: {}",
                    output.status,
                    output.stderr.trim()
                ),
            ));
        }

        Ok(output)
    }
}
