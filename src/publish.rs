//! Publishing a finished batch with git.
//!
//! Runs `git add .`, `git commit` and `git push` in the directory that holds
//! the output directory. Nothing here touches the files already written: a
//! failed step is reported and the batch stays as it is on disk.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Error from the publish step.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PublishError {
    /// git is not on PATH
    #[error("git not found on PATH")]
    GitNotFound,
    /// git could not be started
    #[error("Failed to run git {step}: {source}")]
    Spawn {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// A git step exited unsuccessfully
    #[error("git {step} failed ({status}): {stderr}")]
    Failed { step: &'static str, status: String, stderr: String },
}

/// Directory the git commands run in: the parent of the output directory.
pub fn repository_dir(output_dir: &Path) -> PathBuf {
    match output_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Commit message for a batch.
pub fn commit_message(batch: &str) -> String {
    format!("Add sprites from {}", batch)
}

/// Commits and pushes the working tree.
#[derive(Debug, Clone)]
pub struct Publisher {
    program: PathBuf,
    repo: PathBuf,
}

impl Publisher {
    pub fn new(program: impl Into<PathBuf>, repo: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), repo: repo.into() }
    }

    /// Find git on PATH and target the repository holding `output_dir`.
    pub fn for_output(output_dir: &Path) -> Result<Self, PublishError> {
        let program = which::which("git").map_err(|_| PublishError::GitNotFound)?;
        Ok(Self::new(program, repository_dir(output_dir)))
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Stage everything, commit and push. Stops at the first failing step.
    pub fn publish(&self, batch: &str) -> Result<(), PublishError> {
        self.git("add", &["add", "."])?;
        self.git("commit", &["commit", "-m", &commit_message(batch)])?;
        self.git("push", &["push"])?;
        tracing::info!(repo = %self.repo.display(), batch, "published batch");
        Ok(())
    }

    fn git(&self, step: &'static str, args: &[&str]) -> Result<(), PublishError> {
        tracing::debug!(step, ?args, "running git");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo)
            .output()
            .map_err(|source| PublishError::Spawn { step, source })?;

        if !output.status.success() {
            return Err(PublishError::Failed {
                step,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
