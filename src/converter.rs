//! The document-converter capability.
//!
//! Parsing PDF, DOCX, XLSX, PPTX and friends is not this crate's job. It is
//! delegated to a [`DocumentConverter`], which turns a file on disk into
//! Markdown. The server only ever talks to the trait, so tests swap in doubles
//! that succeed, fail, return nothing or hang, without a real engine installed.
//!
//! [`MarkItDownCommand`] is the production implementation: it runs the
//! `markitdown` executable on the staged file and reads Markdown from stdout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Per-request options forwarded to the converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Keep embedded images as `data:` URIs instead of truncating them.
    pub keep_data_uris: bool,
}

/// A fault reported by the converter. The message is shown to the client
/// unchanged, so implementations should report what the engine said and
/// nothing more.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConverterFault {
    pub message: String,
}

impl ConverterFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Converts a document on disk to Markdown.
///
/// `Ok(None)` means the engine ran but produced no result. Callers treat it
/// the same as `Ok(Some(""))`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(
        &self,
        path: &Path,
        options: &ConvertOptions,
    ) -> Result<Option<String>, ConverterFault>;

    /// Short name for log lines.
    fn name(&self) -> &str {
        "converter"
    }
}

/// Runs the `markitdown` CLI: `markitdown [args…] <path> [--keep-data-uris]`.
///
/// The child is killed if the conversion future is dropped, so a timed-out or
/// abandoned request does not leave a converter running against a temp file
/// that is about to disappear.
#[derive(Debug, Clone)]
pub struct MarkItDownCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl Default for MarkItDownCommand {
    fn default() -> Self {
        Self::new("markitdown")
    }
}

impl MarkItDownCommand {
    /// Use `program` (a name on `PATH` or an absolute path).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument placed before the document path.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl DocumentConverter for MarkItDownCommand {
    async fn convert(
        &self,
        path: &Path,
        options: &ConvertOptions,
    ) -> Result<Option<String>, ConverterFault> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(path);
        if options.keep_data_uris {
            cmd.arg("--keep-data-uris");
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        debug!("Running {} on {}", self.program.display(), path.display());
        let output = cmd.output().await.map_err(|e| {
            ConverterFault::new(format!(
                "Failed to launch {}: {}",
                self.program.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConverterFault::new(
                last_line(&stderr).map(str::to_string).unwrap_or_else(|| {
                    format!("{} exited with {}", self.program.display(), output.status)
                }),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok((!text.is_empty()).then_some(text))
    }

    fn name(&self) -> &str {
        "markitdown"
    }
}

/// Last non-blank line of a diagnostic stream. Python tracebacks end with the
/// exception line, which is the useful part.
fn last_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_line() {
        let tb = "Traceback (most recent call last):\n  File \"x.py\", line 1\nValueError: bad zip\n\n";
        assert_eq!(last_line(tb), Some("ValueError: bad zip"));
        assert_eq!(last_line("  \n\n"), None);
        assert_eq!(last_line(""), None);
    }

    #[test]
    fn default_program_is_markitdown() {
        let c = MarkItDownCommand::default();
        assert_eq!(c.program(), Path::new("markitdown"));
        assert_eq!(c.name(), "markitdown");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_becomes_markdown() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = dir.path().join("doc.md");
        std::fs::write(&doc, "# Hello\n").unwrap();

        let converter = MarkItDownCommand::new("cat");
        let out = converter
            .convert(&doc, &ConvertOptions::default())
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some("# Hello\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_stdout_is_no_result() {
        let converter = MarkItDownCommand::new("sh").arg("-c").arg("true").arg("sh");
        let out = converter
            .convert(Path::new("ignored"), &ConvertOptions::default())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn keep_data_uris_flag_is_forwarded() {
        let converter = MarkItDownCommand::new("sh")
            .arg("-c")
            .arg("echo \"$@\"")
            .arg("sh");
        let options = ConvertOptions {
            keep_data_uris: true,
        };
        let out = converter
            .convert(Path::new("doc.pdf"), &options)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.trim(), "doc.pdf --keep-data-uris");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_last_stderr_line() {
        let converter = MarkItDownCommand::new("sh")
            .arg("-c")
            .arg("echo 'Traceback:' >&2; echo 'UnsupportedFormatException: nope' >&2; exit 1")
            .arg("sh");
        let err = converter
            .convert(Path::new("doc.xyz"), &ConvertOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.message, "UnsupportedFormatException: nope");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_without_stderr_reports_status() {
        let converter = MarkItDownCommand::new("sh").arg("-c").arg("exit 3").arg("sh");
        let err = converter
            .convert(Path::new("doc.pdf"), &ConvertOptions::default())
            .await
            .unwrap_err();
        assert!(err.message.starts_with("sh exited with"), "got: {}", err.message);
    }

    #[tokio::test]
    async fn missing_program_is_a_fault() {
        let converter = MarkItDownCommand::new("definitely-not-a-real-converter-binary");
        let err = converter
            .convert(Path::new("doc.pdf"), &ConvertOptions::default())
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Failed to launch"), "got: {}", err.message);
    }
}
