//! Core library for librarian.
//!
//! Decides which generated client libraries need a release, derives their
//! next versions and drives a batch release run across a language
//! repository. The `librarian` CLI is a thin layer over this crate.
//!
//! # Modules
//!
//! - [`commits`] - Conventional commit classification
//! - [`worthiness`] - Whether a library has anything to release
//! - [`version`] - Next version derivation
//! - [`notes`] - Release notes and descriptions
//! - [`release`] - The batch release run
//! - [`summary`] - Reducing a run to a single action
//! - [`publish`] - Carrying out that action
//! - [`collab`] - Interfaces to version control, tooling, state and code host
//! - [`state`] - Persisted pipeline state
//! - [`git`], [`tools`], [`github`] - Collaborators backed by external programs
//! - [`config`] - Configuration loading and management
//! - [`error`] - Configuration errors
//!
//! # Quick Start
//!
//! ```no_run
//! use librarian_core::collab::StateStore;
//! use librarian_core::state::JsonStateStore;
//! use librarian_core::version::next_version;
//!
//! let store = JsonStateStore::new(".librarian/pipeline-state.json");
//! let state = store.load().expect("state file should load");
//! for library in &state.libraries {
//!     println!("{}: next {:?}", library.id, next_version(library));
//! }
//! ```
#![deny(unsafe_code)]

pub mod collab;

pub mod commits;

pub mod config;

pub mod error;

pub mod git;

pub mod github;

pub mod notes;

pub mod publish;

pub mod release;

pub mod state;

pub mod summary;

pub mod tools;

pub mod version;

pub mod worthiness;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
