use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to start renderer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit. Displays the captured stderr as-is.
    #[error("{stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    /// Exit status was zero but the output document is missing.
    #[error("pdf_not_generated")]
    OutputMissing { path: PathBuf },

    #[error("renderer IO failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub branding: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub path: PathBuf,
}

/// Turns serialized result files into a document.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderedArtifact, RenderError>;
}

/// Runs an external program as
/// `<program> [entrypoint] <inputs...> <output> [--logo=<branding>]`.
///
/// Output is streamed to the log line by line. There is no timeout.
#[derive(Clone)]
pub struct ProcessRenderer {
    program: String,
    entrypoint: Option<PathBuf>,
}

impl fmt::Debug for ProcessRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRenderer")
            .field("program", &self.program)
            .field("entrypoint", &self.entrypoint)
            .finish()
    }
}

impl ProcessRenderer {
    pub fn new(program: impl Into<String>, entrypoint: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            entrypoint,
        }
    }

    fn command(&self, request: &RenderRequest) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(entrypoint) = &self.entrypoint {
            command.arg(entrypoint);
        }
        command.args(&request.inputs).arg(&request.output);
        if let Some(branding) = &request.branding {
            let mut flag = std::ffi::OsString::from("--logo=");
            flag.push(branding);
            command.arg(flag);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

async fn forward_lines<R>(reader: R, is_stderr: bool) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut captured = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if is_stderr {
            error!(target: "hostsweep::renderer", "{line}");
            captured.push(line);
        } else {
            info!(target: "hostsweep::renderer", "{line}");
        }
    }
    Ok(captured)
}

/// A previous run may have left a document at the same path.
async fn remove_stale_output(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale renderer output");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl ReportRenderer for ProcessRenderer {
    async fn render(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderedArtifact, RenderError> {
        debug!(
            program = %self.program,
            inputs = request.inputs.len(),
            output = %request.output.display(),
            "starting renderer"
        );
        remove_stale_output(&request.output).await?;
        let mut child =
            self.command(request)
                .spawn()
                .map_err(|source| RenderError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = async {
            match stdout {
                Some(out) => forward_lines(out, false).await.map(|_| ()),
                None => Ok(()),
            }
        };
        let stderr_task = async {
            match stderr {
                Some(err) => forward_lines(err, true).await,
                None => Ok(Vec::new()),
            }
        };

        let (stdout_result, stderr_result, status) =
            tokio::join!(stdout_task, stderr_task, child.wait());
        stdout_result?;
        let stderr_lines = stderr_result?;
        let status = status?;

        if !status.success() {
            let stderr = if stderr_lines.is_empty() {
                format!("renderer exited with {status}")
            } else {
                stderr_lines.join("\n")
            };
            return Err(RenderError::ProcessFailed {
                code: status.code(),
                stderr,
            });
        }

        if !tokio::fs::try_exists(&request.output).await? {
            return Err(RenderError::OutputMissing {
                path: request.output.clone(),
            });
        }

        Ok(RenderedArtifact {
            path: request.output.clone(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    async fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("render.sh");
        tokio::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
            .await
            .unwrap();
        path
    }

    fn request(dir: &Path) -> RenderRequest {
        RenderRequest {
            inputs: vec![dir.join("result_0.json"), dir.join("result_1.json")],
            output: dir.join("scan_report.pdf"),
            branding: Some(dir.join("logo.svg")),
        }
    }

    #[tokio::test]
    async fn passes_inputs_output_and_branding_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(
            dir.path(),
            r#"for arg in "$@"; do case "$arg" in --logo=*) logo="$arg" ;; *) out="$arg" ;; esac; done
echo "rendering $# args"
printf '%s\n' "$@" > "$out"
test -n "$logo""#,
        )
        .await;
        let renderer = ProcessRenderer::new("sh", Some(entry));
        let request = request(dir.path());

        let artifact = renderer.render(&request).await.unwrap();

        assert_eq!(artifact.path, request.output);
        let written = tokio::fs::read_to_string(&request.output).await.unwrap();
        let args: Vec<&str> = written.lines().collect();
        assert_eq!(args.len(), 4);
        assert!(args[0].ends_with("result_0.json"));
        assert!(args[1].ends_with("result_1.json"));
        assert!(args[2].ends_with("scan_report.pdf"));
        assert!(args[3].starts_with("--logo=") && args[3].ends_with("logo.svg"));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "echo 'font missing' >&2\nexit 3").await;
        let renderer = ProcessRenderer::new("sh", Some(entry));

        let err = renderer.render(&request(dir.path())).await.unwrap_err();

        match err {
            RenderError::ProcessFailed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "font missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_exit_without_output_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "exit 0").await;
        let renderer = ProcessRenderer::new("sh", Some(entry));

        let err = renderer.render(&request(dir.path())).await.unwrap_err();

        assert!(matches!(err, RenderError::OutputMissing { .. }));
        assert_eq!(err.to_string(), "pdf_not_generated");
    }

    #[tokio::test]
    async fn leftover_output_from_earlier_run_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "exit 0").await;
        let renderer = ProcessRenderer::new("sh", Some(entry));
        let request = request(dir.path());
        tokio::fs::write(&request.output, b"%PDF old").await.unwrap();

        let err = renderer.render(&request).await.unwrap_err();

        assert!(matches!(err, RenderError::OutputMissing { .. }));
        assert!(!request.output.exists());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ProcessRenderer::new("/nonexistent/hostsweep-renderer", None);

        let err = renderer.render(&request(dir.path())).await.unwrap_err();

        assert!(matches!(err, RenderError::Spawn { .. }));
    }
}
