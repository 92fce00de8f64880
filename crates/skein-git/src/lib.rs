//! Git adapter for the skein audit trail.
//!
//! This crate is intentionally thin: it shells out to `git` to stage and
//! commit the snapshot file after each accepted mutation. Absence of the
//! `git` binary, or of an enclosing repository, is a normal detected
//! condition — the tracker runs without an audit trail, it does not fail.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Errors from interacting with a git repository.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git executable is not available in PATH")]
    NotInstalled,

    #[error("{0} is not inside a git repository")]
    NotARepository(String),

    #[error("git command failed: git {args} ({message})")]
    CommandFailed { args: String, message: String },

    #[error("unable to parse git output: {0}")]
    Parse(String),
}

/// Thin client around the `git` CLI, pinned to one repository root.
#[derive(Debug, Clone)]
pub struct GitClient {
    repo_root: PathBuf,
}

impl GitClient {
    /// Returns true if `git` is available in PATH.
    pub fn is_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Discover the repository containing `path` via `git rev-parse`.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let stdout = run_git(path, &["rev-parse", "--show-toplevel"]).map_err(|err| {
            match err {
                GitError::CommandFailed { .. } => {
                    GitError::NotARepository(path.display().to_string())
                }
                other => other,
            }
        })?;
        let root = first_nonempty_line(&stdout)
            .ok_or_else(|| GitError::Parse("git rev-parse returned empty output".to_string()))?;
        Ok(Self {
            repo_root: PathBuf::from(root),
        })
    }

    /// Filesystem path to the detected repository root.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Stage `file` and commit it with `message`, attributed to `actor`.
    ///
    /// The actor label becomes the commit author; the committer identity is
    /// pinned so the commit succeeds in repositories with no user config.
    pub fn commit_file(&self, file: &Path, message: &str, actor: &str) -> Result<(), GitError> {
        let file = file.display().to_string();
        run_git(&self.repo_root, &["add", "--", &file])?;

        let author = author_signature(actor);
        run_git(
            &self.repo_root,
            &[
                "-c",
                "user.name=skein",
                "-c",
                "user.email=skein@skein.local",
                "commit",
                "--quiet",
                "-m",
                message,
                "--author",
                &author,
                "--",
                &file,
            ],
        )?;
        Ok(())
    }

    /// Subject line of the most recent commit, if any.
    pub fn last_commit_subject(&self) -> Result<String, GitError> {
        let stdout = run_git(&self.repo_root, &["log", "-1", "--pretty=%s"])?;
        first_nonempty_line(&stdout)
            .map(ToOwned::to_owned)
            .ok_or_else(|| GitError::Parse("git log returned empty output".to_string()))
    }
}

/// Build a `Name <email>` signature from a free-form actor label.
///
/// Angle brackets and newlines would break `--author` parsing; the email
/// local part keeps only characters git accepts without quoting.
fn author_signature(actor: &str) -> String {
    let name: String = actor
        .chars()
        .map(|ch| match ch {
            '<' | '>' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect();
    let name = name.trim();
    let name = if name.is_empty() { "anonymous" } else { name };

    let local: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    format!("{name} <{local}@skein.local>")
}

fn run_git(cwd: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                GitError::NotInstalled
            } else {
                GitError::CommandFailed {
                    args: args.join(" "),
                    message: err.to_string(),
                }
            }
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            "unknown error".to_string()
        } else {
            stderr
        };
        Err(GitError::CommandFailed {
            args: args.join(" "),
            message,
        })
    }
}

fn first_nonempty_line(input: &str) -> Option<&str> {
    input.lines().map(str::trim).find(|line| !line.is_empty())
}
