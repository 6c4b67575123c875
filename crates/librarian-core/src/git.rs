//! Git operations for release runs.
//!
//! Shells out to `git` for all operations. This ensures we inherit the user's
//! SSH keys, GPG signing, hooks, and other configuration.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::collab::{CommitSource, WorkingTree};
use crate::commits::Commit;

/// `git log` format: hash, NUL, raw body, record separator.
const LOG_FORMAT: &str = "--format=%H%x00%B%x1e";
/// Separates fields within one `git log` record.
const FIELD_SEP: char = '\u{0}';
/// Terminates one `git log` record.
const RECORD_SEP: char = '\u{1e}';

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A git working tree rooted at a directory.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: Utf8PathBuf,
}

impl GitRepo {
    /// Open the repository containing `root`.
    #[instrument(skip_all, fields(root = %root.as_ref()))]
    pub fn open(root: impl AsRef<Utf8Path>) -> GitResult<Self> {
        let repo = Self {
            root: root.as_ref().to_path_buf(),
        };
        let inside = repo.git(&["rev-parse", "--is-inside-work-tree"])?;
        if inside.trim() != "true" {
            return Err(GitError::NotARepo);
        }
        Ok(repo)
    }

    /// Open the repository that contains `dir`, rooted at its top level.
    #[instrument(skip_all, fields(dir = %dir.as_ref()))]
    pub fn discover(dir: impl AsRef<Utf8Path>) -> GitResult<Self> {
        let probe = Self::open(dir)?;
        let top = probe.git(&["rev-parse", "--show-toplevel"])?;
        let root = Utf8PathBuf::from(top.trim());
        debug!(%root, "repository root");
        Ok(Self { root })
    }

    /// The directory git commands run in.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Hash of the current `HEAD` commit.
    pub fn head(&self) -> GitResult<String> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// Get the current branch name.
    ///
    /// Returns `None` if in a detached HEAD state.
    #[instrument(skip(self))]
    pub fn current_branch(&self) -> GitResult<Option<String>> {
        let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = output.trim().to_string();
        if branch == "HEAD" {
            debug!("detached HEAD");
            Ok(None)
        } else {
            debug!(%branch, "current branch");
            Ok(Some(branch))
        }
    }

    /// Push `HEAD` to `branch` on `remote`, creating it if needed.
    #[instrument(skip(self))]
    pub fn push_head(&self, remote: &str, branch: &str) -> GitResult<()> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        self.git(&["push", remote, &refspec])?;
        debug!(%remote, %branch, "pushed");
        Ok(())
    }

    /// Run a git command in the repository root and return its stdout.
    fn git(&self, args: &[&str]) -> GitResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.root.as_std_path())
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            if stderr.contains("not a git repository") {
                return Err(GitError::NotARepo);
            }

            Err(GitError::Command {
                command: args.first().unwrap_or(&"").to_string(),
                stderr,
            })
        }
    }
}

impl CommitSource for GitRepo {
    #[instrument(skip(self))]
    fn commits_for_paths_since(&self, paths: &[String], tag: &str) -> GitResult<Vec<Commit>> {
        if !tag.is_empty() {
            self.git(&["rev-parse", "--verify", &format!("{tag}^{{commit}}")])?;
        }
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let range = if tag.is_empty() {
            "HEAD".to_string()
        } else {
            format!("{tag}..HEAD")
        };
        let mut args = vec!["log", "--reverse", LOG_FORMAT, range.as_str(), "--"];
        args.extend(paths.iter().map(String::as_str));

        let commits = parse_log(&self.git(&args)?);
        debug!(count = commits.len(), "commits since tag");
        Ok(commits)
    }
}

impl WorkingTree for GitRepo {
    fn add_all(&self) -> GitResult<()> {
        self.git(&["add", "--all"])?;
        Ok(())
    }

    #[instrument(skip_all)]
    fn commit(&self, message: &str) -> GitResult<String> {
        self.git(&["commit", "--quiet", "--message", message])?;
        let hash = self.head()?;
        debug!(%hash, "created commit");
        Ok(hash)
    }

    fn is_clean(&self) -> GitResult<bool> {
        let output = self.git(&["status", "--porcelain"])?;
        let clean = output.trim().is_empty();
        debug!(clean, "working tree status");
        Ok(clean)
    }

    #[instrument(skip(self))]
    fn clean_working_tree(&self) -> GitResult<()> {
        self.git(&["reset", "--hard", "--quiet", "HEAD"])?;
        self.git(&["clean", "-d", "--force", "--quiet"])?;
        Ok(())
    }
}

/// Split `git log` output produced with the record/field separators.
fn parse_log(output: &str) -> Vec<Commit> {
    output
        .split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            let (hash, message) = record.split_once(FIELD_SEP)?;
            Some(Commit::new(hash.trim(), message.trim_end()))
        })
        .collect()
}
