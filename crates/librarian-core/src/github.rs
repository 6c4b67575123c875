//! Publishing release changes as GitHub pull requests.
//!
//! Uses `git push` to put the release commits on a fresh branch and the `gh`
//! CLI to open and label the pull request, so authentication is whatever
//! `gh auth` already has.

use tracing::{debug, instrument};

use crate::collab::Publisher;
use crate::git::GitRepo;
use crate::tools::{ToolResult, run_program};

/// A [`Publisher`] that opens GitHub pull requests.
#[derive(Debug, Clone)]
pub struct GitHubPublisher {
    repo: GitRepo,
    remote: String,
    review_label: String,
}

impl GitHubPublisher {
    /// Publish from `repo`, pushing to `remote` and flagging with `review_label`.
    pub fn new(repo: GitRepo, remote: impl Into<String>, review_label: impl Into<String>) -> Self {
        Self {
            repo,
            remote: remote.into(),
            review_label: review_label.into(),
        }
    }

    fn gh(&self, args: &[&str]) -> ToolResult<String> {
        run_program("gh", args, self.repo.root())
    }
}

impl Publisher for GitHubPublisher {
    /// Push `HEAD` to `branch` and open a pull request from it.
    ///
    /// Returns the pull request URL, or the branch name when `gh` prints
    /// nothing; both are accepted by `gh pr edit`.
    #[instrument(skip(self, body))]
    fn create_change(&self, branch: &str, title: &str, body: &str) -> ToolResult<String> {
        self.repo.push_head(&self.remote, branch)?;
        let output = self.gh(&[
            "pr", "create", "--head", branch, "--title", title, "--body", body,
        ])?;
        let url = output.trim();
        debug!(%url, "pull request created");
        Ok(if url.is_empty() {
            branch.to_string()
        } else {
            url.to_string()
        })
    }

    #[instrument(skip(self))]
    fn flag_for_manual_review(&self, change_id: &str) -> ToolResult<()> {
        self.gh(&["pr", "edit", change_id, "--add-label", &self.review_label])?;
        Ok(())
    }
}
