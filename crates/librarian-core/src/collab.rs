//! Collaborator interfaces consumed by the release orchestrator.
//!
//! Everything that touches the outside world (version control, the release
//! tooling of a language repository, the state file, the code host) sits
//! behind one of these traits. The shipped implementations live in
//! [`git`](crate::git), [`tools`](crate::tools), [`state`](crate::state) and
//! [`github`](crate::github); tests substitute in-memory fakes.
//!
//! All calls are synchronous and blocking.

use camino::Utf8Path;

use crate::commits::Commit;
use crate::git::GitResult;
use crate::state::{PipelineState, StateResult};
use crate::tools::ToolResult;

/// Source of commit history.
pub trait CommitSource {
    /// All commits touching any of `paths` since `tag`, oldest first.
    ///
    /// An empty `tag` means the whole history. An unknown tag is an error,
    /// even when `paths` is empty.
    fn commits_for_paths_since(&self, paths: &[String], tag: &str) -> GitResult<Vec<Commit>>;
}

/// Arguments for preparing a library release.
#[derive(Debug, Clone, Copy)]
pub struct PrepareRequest<'a> {
    /// Library being released.
    pub library_id: &'a str,
    /// Version the release will carry.
    pub version: &'a str,
    /// File holding the formatted release notes.
    pub notes_path: &'a Utf8Path,
}

/// Language-specific release preparation (version files, changelogs).
pub trait ReleasePreparer {
    /// Update the working tree for a release of one library.
    fn prepare_release(&self, request: &PrepareRequest<'_>) -> ToolResult<()>;
}

/// Language-specific build and test.
pub trait LibraryBuilder {
    /// Build and test one library in the working tree.
    fn build_library(&self, library_id: &str) -> ToolResult<()>;
}

/// The working tree the batch modifies and commits into.
pub trait WorkingTree {
    /// Stage every change, including new and deleted files.
    fn add_all(&self) -> GitResult<()>;
    /// Commit staged changes, returning the new commit hash.
    fn commit(&self, message: &str) -> GitResult<String>;
    /// Whether there are no staged or unstaged changes.
    fn is_clean(&self) -> GitResult<bool>;
    /// Discard all uncommitted changes, including untracked files.
    fn clean_working_tree(&self) -> GitResult<()>;
}

/// Whole-object persistence for [`PipelineState`].
pub trait StateStore {
    /// Read the full state.
    fn load(&self) -> StateResult<PipelineState>;
    /// Replace the full state.
    fn save(&self, state: &PipelineState) -> StateResult<()>;
}

/// Code host that receives the aggregated change.
pub trait Publisher {
    /// Publish the current commits as a change on `branch`, returning its id.
    fn create_change(&self, branch: &str, title: &str, body: &str) -> ToolResult<String>;
    /// Mark a change as needing manual review before merge.
    fn flag_for_manual_review(&self, change_id: &str) -> ToolResult<()>;
}
