//! The batch release run.
//!
//! [`run_release`] walks every configured library in order and, for each
//! one that has release-worthy changes, derives a version, writes release
//! notes, hands off to the repository's release tooling and commits the
//! result. All libraries share one working tree and one state document, so
//! processing is strictly sequential.
//!
//! # Failure model
//!
//! Each library produces a `Result<LibraryOutcome, ReleaseError>`:
//!
//! - `Ok(LibraryOutcome::Failed { .. })` is a library-level failure
//!   (commit lookup, notes file, preparation, build). It is recorded in the
//!   [`RunOutcome`] and the run moves on to the next library.
//! - `Err(ReleaseError)` is fatal (version derivation, reverting the
//!   working tree, saving state, committing). The run stops immediately.

use std::fmt;

use camino::Utf8PathBuf;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::collab::{
    CommitSource, LibraryBuilder, PrepareRequest, ReleasePreparer, StateStore, WorkingTree,
};
use crate::commits::classify_all;
use crate::git::GitError;
use crate::notes::{format_release_notes, release_description, write_release_notes};
use crate::state::{LibraryState, PipelineState, StateError};
use crate::version::{VersionError, next_version};
use crate::worthiness::is_release_worthy;

/// Errors that abort a whole release run.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// The next version could not be derived.
    #[error("cannot determine next version of {library_id}: {source}")]
    Version {
        /// Library being released.
        library_id: String,
        /// Underlying version error.
        source: VersionError,
    },

    /// The working tree could not be restored after a failed step.
    #[error("failed to revert working tree after {library_id} failed: {source}")]
    Revert {
        /// Library whose changes were being discarded.
        library_id: String,
        /// Underlying git error.
        source: GitError,
    },

    /// The updated state could not be saved.
    #[error("failed to save state after releasing {library_id}: {source}")]
    SaveState {
        /// Library that was just released.
        library_id: String,
        /// Underlying state error.
        source: StateError,
    },

    /// The release commit could not be created.
    #[error("failed to commit release of {library_id}: {source}")]
    Commit {
        /// Library that was just released.
        library_id: String,
        /// Underlying git error.
        source: GitError,
    },
}

/// Result alias for release runs.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Collaborators a release run talks to.
#[derive(Clone, Copy)]
pub struct ReleaseContext<'a> {
    /// Commit history.
    pub commits: &'a dyn CommitSource,
    /// Language-specific release preparation.
    pub preparer: &'a dyn ReleasePreparer,
    /// Language-specific build and test.
    pub builder: &'a dyn LibraryBuilder,
    /// The shared working tree.
    pub tree: &'a dyn WorkingTree,
    /// Where state is saved after each release.
    pub store: &'a dyn StateStore,
}

impl fmt::Debug for ReleaseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseContext").finish_non_exhaustive()
    }
}

/// Knobs for a release run.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Skip the build and test step.
    pub skip_build: bool,
    /// Directory release notes files are written to.
    pub notes_dir: Utf8PathBuf,
}

/// The step a library-level failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    /// Listing commits since the previous release.
    CommitLookup,
    /// Writing the release notes file.
    WriteNotes,
    /// Running the release preparation tooling.
    Prepare,
    /// Building and testing the library.
    Build,
}

impl fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CommitLookup => "look up commits",
            Self::WriteNotes => "write release notes",
            Self::Prepare => "prepare release",
            Self::Build => "build",
        })
    }
}

/// Why a library was not released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Release automation is blocked for the library.
    Blocked,
    /// No release-worthy commits since the previous release.
    NothingToRelease,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blocked => "release automation blocked",
            Self::NothingToRelease => "no release-worthy changes",
        })
    }
}

/// What happened to one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryOutcome {
    /// The library was released and committed.
    Released {
        /// The new version.
        version: String,
        /// One-line release description.
        description: String,
        /// Hash of the release commit.
        commit: String,
    },
    /// The library was left alone.
    Skipped {
        /// Why it was skipped.
        reason: SkipReason,
    },
    /// A library-level step failed; the run carried on.
    Failed {
        /// The failing step.
        step: ReleaseStep,
        /// Human-readable error, as recorded in the run outcome.
        error: String,
    },
}

/// Progress notifications emitted while a run is underway.
#[derive(Debug, Clone, Copy)]
pub enum ReleaseEvent<'a> {
    /// Processing of a library began.
    LibraryStarted {
        /// Library id.
        library_id: &'a str,
    },
    /// Processing of a library completed without a fatal error.
    LibraryFinished {
        /// Library id.
        library_id: &'a str,
        /// What happened.
        outcome: &'a LibraryOutcome,
    },
}

/// Release and error descriptions collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// One line per released library, in processing order.
    pub releases: Vec<String>,
    /// One line per library-level failure, in processing order.
    pub errors: Vec<String>,
}

/// Outcome of one library in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryReport {
    /// Library id.
    pub library_id: String,
    /// What happened.
    pub outcome: LibraryOutcome,
}

/// Everything a completed run hands back.
#[derive(Debug, Clone)]
pub struct ReleaseRun {
    /// The state after the run, including every recorded release.
    pub state: PipelineState,
    /// Descriptions for the summarizer.
    pub outcome: RunOutcome,
    /// Per-library results, in processing order.
    pub libraries: Vec<LibraryReport>,
}

/// Release every library in `state` that has something to release.
///
/// The state is saved through `ctx.store` after each successful release and
/// returned in the [`ReleaseRun`] once all libraries are processed.
#[instrument(skip_all, fields(libraries = state.libraries.len(), skip_build = options.skip_build))]
pub fn run_release(
    mut state: PipelineState,
    ctx: &ReleaseContext<'_>,
    options: &ReleaseOptions,
    mut on_event: impl FnMut(ReleaseEvent<'_>),
) -> ReleaseResult<ReleaseRun> {
    let mut outcome = RunOutcome::default();
    let mut libraries = Vec::with_capacity(state.libraries.len());

    for index in 0..state.libraries.len() {
        let library_id = state.libraries[index].id.clone();
        on_event(ReleaseEvent::LibraryStarted {
            library_id: &library_id,
        });

        let result = release_library(&mut state, index, ctx, options)?;
        match &result {
            LibraryOutcome::Released { description, .. } => {
                outcome.releases.push(description.clone());
            }
            LibraryOutcome::Failed { error, .. } => outcome.errors.push(error.clone()),
            LibraryOutcome::Skipped { reason } => debug!(%library_id, %reason, "skipped"),
        }

        on_event(ReleaseEvent::LibraryFinished {
            library_id: &library_id,
            outcome: &result,
        });
        libraries.push(LibraryReport {
            library_id,
            outcome: result,
        });
    }

    info!(
        released = outcome.releases.len(),
        failed = outcome.errors.len(),
        "release run complete"
    );
    Ok(ReleaseRun {
        state,
        outcome,
        libraries,
    })
}

/// Process the library at `index`, updating `state` on success.
#[instrument(skip_all, fields(library_id = %state.libraries[index].id))]
fn release_library(
    state: &mut PipelineState,
    index: usize,
    ctx: &ReleaseContext<'_>,
    options: &ReleaseOptions,
) -> ReleaseResult<LibraryOutcome> {
    let library = &state.libraries[index];
    let id = library.id.clone();

    if library.release_automation_level.is_blocked() {
        return Ok(LibraryOutcome::Skipped {
            reason: SkipReason::Blocked,
        });
    }

    let tag = library.previous_tag();
    let paths = state.release_paths(library);
    let commits = match ctx.commits.commits_for_paths_since(&paths, &tag) {
        Ok(commits) => commits,
        Err(e) => return Ok(failed(&id, ReleaseStep::CommitLookup, &e)),
    };

    let classified = classify_all(&commits);
    if !is_release_worthy(&classified, &id) {
        return Ok(LibraryOutcome::Skipped {
            reason: SkipReason::NothingToRelease,
        });
    }

    let version = next_version(library).map_err(|source| ReleaseError::Version {
        library_id: id.clone(),
        source,
    })?;
    info!(%version, commits = commits.len(), "releasing");

    let notes = format_release_notes(&classified);
    let notes_path = match write_release_notes(&options.notes_dir, &id, &version, &notes) {
        Ok(path) => path,
        Err(e) => return Ok(failed(&id, ReleaseStep::WriteNotes, &e)),
    };

    let request = PrepareRequest {
        library_id: &id,
        version: &version,
        notes_path: &notes_path,
    };
    if let Err(e) = ctx.preparer.prepare_release(&request) {
        return revert(ctx, &id).map(|()| failed(&id, ReleaseStep::Prepare, &e));
    }
    if options.skip_build {
        debug!("build skipped");
    } else if let Err(e) = ctx.builder.build_library(&id) {
        return revert(ctx, &id).map(|()| failed(&id, ReleaseStep::Build, &e));
    }

    record(&mut state.libraries[index], &version);
    ctx.store
        .save(state)
        .map_err(|source| ReleaseError::SaveState {
            library_id: id.clone(),
            source,
        })?;

    let description = release_description(&id, &version);
    ctx.tree
        .add_all()
        .and_then(|()| ctx.tree.commit(&format!("{description}\n\n{notes}")))
        .map(|commit| LibraryOutcome::Released {
            version,
            description,
            commit,
        })
        .map_err(|source| ReleaseError::Commit {
            library_id: id,
            source,
        })
}

fn record(library: &mut LibraryState, version: &str) {
    library.record_release(version.to_string(), Utc::now());
}

fn failed(library_id: &str, step: ReleaseStep, error: &dyn fmt::Display) -> LibraryOutcome {
    let error = format!("failed to {step} for {library_id}: {error}");
    warn!(%library_id, %step, %error, "library failed");
    LibraryOutcome::Failed { step, error }
}

fn revert(ctx: &ReleaseContext<'_>, library_id: &str) -> ReleaseResult<()> {
    ctx.tree
        .clean_working_tree()
        .map_err(|source| ReleaseError::Revert {
            library_id: library_id.to_string(),
            source,
        })
}
