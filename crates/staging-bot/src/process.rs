use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use staging_core::{Result, StagingError};

// ─── Invocation ───────────────────────────────────────────────────────────

/// A single `git` or `osc` invocation.
///
/// stdout and stderr are captured; stdin is only piped when
/// [`Invocation::stdin`] was given.
#[derive(Debug)]
pub(crate) struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
    stdin: Option<String>,
}

/// Captured result of a finished process.
#[derive(Debug)]
pub(crate) struct Captured {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Invocation {
    pub(crate) fn new(program: &str, cwd: &Path) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            stdin: None,
        }
    }

    pub(crate) fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub(crate) fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion and capture the output regardless of exit code.
    pub(crate) async fn output(self) -> Result<Captured> {
        tracing::debug!(command = %self.display(), cwd = %self.cwd.display(), "spawning");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(StagingError::Io)?;

        if let Some(input) = &self.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await?;
                // dropping stdin closes the pipe so the child sees EOF
            }
        }

        let output = child.wait_with_output().await?;
        let captured = Captured {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::trace!(code = captured.code, stdout = %captured.stdout, stderr = %captured.stderr);
        Ok(captured)
    }

    /// Run to completion and return stdout; a non-zero exit is an error.
    pub(crate) async fn run(self) -> Result<String> {
        let command = self.display();
        let captured = self.output().await?;
        if captured.code != 0 {
            return Err(StagingError::CommandFailed {
                command,
                code: captured.code,
                stderr: captured.stderr.trim().chars().take(2000).collect(),
            });
        }
        Ok(captured.stdout)
    }

    /// Run to completion and return only the exit code.
    pub(crate) async fn status(self) -> Result<i32> {
        Ok(self.output().await?.code)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
