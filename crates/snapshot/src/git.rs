//! Async `git` command runner

use crate::{Result, SnapshotError};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Identity used for checkpoint commits when the repository has none configured
const IDENTITY: [&str; 4] = [
    "-c",
    "user.name=brainvibe",
    "-c",
    "user.email=brainvibe@localhost",
];

/// Runs `git` subcommands in a fixed working directory
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Run a command, returning trimmed stdout
    pub async fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(args, None).await?;
        let stdout = decode(&command, output)?;
        Ok(stdout.trim_end().to_string())
    }

    /// Run a command, returning raw stdout with invalid UTF-8 replaced
    ///
    /// Used for patches, which may contain arbitrary file content.
    pub async fn run_lossy<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(args, None).await?;
        let output = check(&command, output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a command feeding `input` on stdin, returning trimmed stdout
    pub async fn run_with_stdin<I, S>(&self, args: I, input: &[u8]) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(args, Some(input)).await?;
        let stdout = decode(&command, output)?;
        Ok(stdout.trim_end().to_string())
    }

    /// Run a command that signals "absent" with a non-zero exit
    ///
    /// Returns `None` instead of an error when git exits unsuccessfully.
    pub async fn try_run<I, S>(&self, args: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(args, None).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|source| SnapshotError::Utf8 { command, source })?;
        Ok(Some(stdout.trim_end().to_string()))
    }

    async fn output<I, S>(&self, args: I, input: Option<&[u8]>) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        debug!("git {}", command);

        let spawn_err = |source| SnapshotError::Spawn {
            command: command.clone(),
            dir: self.workdir.clone(),
            source,
        };

        let mut cmd = Command::new("git");
        cmd.current_dir(&self.workdir)
            .args(IDENTITY)
            .args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match input {
            None => cmd.stdin(Stdio::null()).output().await.map_err(spawn_err)?,
            Some(input) => {
                let mut child = cmd.stdin(Stdio::piped()).spawn().map_err(spawn_err)?;
                if let Some(mut stdin) = child.stdin.take() {
                    stdin.write_all(input).await.map_err(spawn_err)?;
                }
                child.wait_with_output().await.map_err(spawn_err)?
            }
        };

        Ok((command, output))
    }
}

fn check(command: &str, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    Err(SnapshotError::Git {
        command: command.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn decode(command: &str, output: Output) -> Result<String> {
    let output = check(command, output)?;
    String::from_utf8(output.stdout).map_err(|source| SnapshotError::Utf8 {
        command: command.to_string(),
        source,
    })
}
