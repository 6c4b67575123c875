//! Persisted pipeline state.
//!
//! One JSON document per language repository records every configured
//! library and the pipeline-wide settings. The release orchestrator is the
//! only writer during a run, and always replaces the whole document.
//!
//! Keys this crate doesn't model are kept in passthrough maps so that a
//! load followed by a save never drops data written by other tools.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::collab::StateStore;

/// Default location of the state file, relative to the repository root.
pub const DEFAULT_STATE_PATH: &str = ".librarian/pipeline-state.json";

/// Errors from reading or writing the state file.
#[derive(Error, Debug)]
pub enum StateError {
    /// Reading or writing the file failed.
    #[error("failed to access state file {path}: {source}")]
    Io {
        /// The state file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid state document.
    #[error("invalid state file {path}: {source}")]
    Parse {
        /// The state file path.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The state could not be serialized.
    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The temporary file could not replace the state file.
    #[error("failed to replace state file {path}: {source}")]
    Persist {
        /// The state file path.
        path: Utf8PathBuf,
        /// Underlying persist error.
        source: tempfile::PersistError,
    },
}

/// Result alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Per-library automation gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutomationLevel {
    /// Not specified; treated like [`AutomationLevel::Automatic`].
    #[default]
    #[serde(rename = "AUTOMATION_LEVEL_NONE")]
    Unspecified,
    /// Never processed automatically.
    #[serde(rename = "AUTOMATION_LEVEL_BLOCKED")]
    Blocked,
    /// Processed, but changes need a human to approve them.
    #[serde(rename = "AUTOMATION_LEVEL_MANUAL_REVIEW")]
    ManualReview,
    /// Processed and merged without intervention.
    #[serde(rename = "AUTOMATION_LEVEL_AUTOMATIC")]
    Automatic,
}

impl AutomationLevel {
    /// Whether this level stops all automatic processing.
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }

    const fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

/// State of one configured library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryState {
    /// Stable library identifier, also the tag prefix.
    pub id: String,
    /// Last released version; empty before the first release.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_version: String,
    /// Explicit version for the next release, bypassing derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_version: Option<String>,
    /// Gate for code generation. Carried, not interpreted.
    #[serde(default, skip_serializing_if = "AutomationLevel::is_unspecified")]
    pub generation_automation_level: AutomationLevel,
    /// Gate for releases.
    #[serde(default, skip_serializing_if = "AutomationLevel::is_unspecified")]
    pub release_automation_level: AutomationLevel,
    /// When this library was last released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_timestamp: Option<DateTime<Utc>>,
    /// Last commit that generation ran against.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_generated_commit: String,
    /// Last commit that was released.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_released_commit: String,
    /// API definition paths the library is generated from. Carried, not interpreted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_paths: Vec<String>,
    /// Paths whose changes count toward this library.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_paths: Vec<String>,
    /// Keys not modeled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LibraryState {
    /// The tag the previous release was published under.
    ///
    /// Empty when the library has never been released, which means
    /// "all history".
    pub fn previous_tag(&self) -> String {
        if self.current_version.is_empty() {
            String::new()
        } else {
            format!("{}-{}", self.id, self.current_version)
        }
    }

    /// Record a successful release.
    pub fn record_release(&mut self, version: String, at: DateTime<Utc>) {
        self.current_version = version;
        self.last_released_commit = self.last_generated_commit.clone();
        self.release_timestamp = Some(at);
    }
}

/// The whole persisted pipeline state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    /// Container image used for generation. Carried, not interpreted.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_tag: String,
    /// Paths whose changes count toward every library.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_library_source_paths: Vec<String>,
    /// Every configured library, in processing order.
    #[serde(default)]
    pub libraries: Vec<LibraryState>,
    /// Keys not modeled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineState {
    /// Paths whose changes count toward `library`: its own source paths
    /// followed by the common paths, without duplicates.
    pub fn release_paths(&self, library: &LibraryState) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for path in library
            .source_paths
            .iter()
            .chain(&self.common_library_source_paths)
        {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// Find a library by id.
    pub fn library(&self, id: &str) -> Option<&LibraryState> {
        self.libraries.iter().find(|l| l.id == id)
    }
}

/// A [`StateStore`] backed by a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: Utf8PathBuf,
}

impl JsonStateStore {
    /// Create a store for the file at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file this store reads and writes.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonStateStore {
    #[instrument(skip(self), fields(path = %self.path))]
    fn load(&self) -> StateResult<PipelineState> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let state: PipelineState =
            serde_json::from_str(&contents).map_err(|source| StateError::Parse {
                path: self.path.clone(),
                source,
            })?;
        debug!(libraries = state.libraries.len(), "loaded pipeline state");
        Ok(state)
    }

    /// Replace the state file atomically via a sibling temp file.
    #[instrument(skip(self, state), fields(path = %self.path))]
    fn save(&self, state: &PipelineState) -> StateResult<()> {
        let mut json = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
        json.push('\n');

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|source| StateError::Persist {
                path: self.path.clone(),
                source,
            })?;

        debug!(libraries = state.libraries.len(), "saved pipeline state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
  "imageTag": "gcr.io/generator:1.2",
  "commonLibrarySourcePaths": ["generator/common", "Directory.Build.props"],
  "libraries": [
    {
      "id": "Google.Cloud.Storage.V1",
      "currentVersion": "4.1.0",
      "releaseAutomationLevel": "AUTOMATION_LEVEL_AUTOMATIC",
      "generationAutomationLevel": "AUTOMATION_LEVEL_MANUAL_REVIEW",
      "lastGeneratedCommit": "abc",
      "apiPaths": ["google/storage/v1"],
      "sourcePaths": ["apis/Google.Cloud.Storage.V1"],
      "customField": {"nested": [1, 2, 3]}
    },
    {
      "id": "Google.Cloud.PubSub.V1",
      "releaseAutomationLevel": "AUTOMATION_LEVEL_BLOCKED"
    }
  ],
  "futurePipelineSetting": true
}"#;

    fn temp_store(tmp: &TempDir) -> JsonStateStore {
        let path = Utf8PathBuf::try_from(tmp.path().join(".librarian/pipeline-state.json")).unwrap();
        JsonStateStore::new(path)
    }

    #[test]
    fn parses_sample_document() {
        let state: PipelineState = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(state.image_tag, "gcr.io/generator:1.2");
        assert_eq!(state.libraries.len(), 2);

        let storage = &state.libraries[0];
        assert_eq!(storage.current_version, "4.1.0");
        assert_eq!(storage.release_automation_level, AutomationLevel::Automatic);
        assert!(storage.extra.contains_key("customField"));
        assert!(state.libraries[1].release_automation_level.is_blocked());
        assert_eq!(state.extra.get("futurePipelineSetting"), Some(&Value::Bool(true)));
    }

    #[test]
    fn round_trip_is_lossless() {
        let original: Value = serde_json::from_str(SAMPLE).unwrap();
        let state: PipelineState = serde_json::from_str(SAMPLE).unwrap();
        let written = serde_json::to_value(&state).unwrap();
        assert_eq!(written, original);
    }

    #[test]
    fn previous_tag() {
        let mut lib = LibraryState {
            id: "storage".into(),
            ..LibraryState::default()
        };
        assert_eq!(lib.previous_tag(), "");
        lib.current_version = "1.2.3".into();
        assert_eq!(lib.previous_tag(), "storage-1.2.3");
    }

    #[test]
    fn record_release_updates_fields() {
        let mut lib = LibraryState {
            id: "storage".into(),
            current_version: "1.2.3".into(),
            last_generated_commit: "def".into(),
            last_released_commit: "abc".into(),
            ..LibraryState::default()
        };
        let now = Utc::now();
        lib.record_release("1.3.0".into(), now);
        assert_eq!(lib.current_version, "1.3.0");
        assert_eq!(lib.last_released_commit, "def");
        assert_eq!(lib.release_timestamp, Some(now));
    }

    #[test]
    fn release_paths_dedupes_in_order() {
        let state = PipelineState {
            common_library_source_paths: vec!["common".into(), "a".into()],
            ..PipelineState::default()
        };
        let lib = LibraryState {
            source_paths: vec!["a".into(), "b".into()],
            ..LibraryState::default()
        };
        assert_eq!(state.release_paths(&lib), vec!["a", "b", "common"]);
    }

    #[test]
    fn store_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = temp_store(&tmp);
        let state: PipelineState = serde_json::from_str(SAMPLE).unwrap();

        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn store_save_replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        let store = temp_store(&tmp);
        let mut state: PipelineState = serde_json::from_str(SAMPLE).unwrap();
        store.save(&state).unwrap();

        state.libraries[0].current_version = "4.2.0".into();
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.libraries[0].current_version, "4.2.0");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = temp_store(&tmp).load().unwrap_err();
        assert!(matches!(err, StateError::Io { .. }));
    }

    #[test]
    fn load_invalid_json_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let store = temp_store(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load().unwrap_err(), StateError::Parse { .. }));
    }

    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let mut lib = LibraryState {
            id: "storage".into(),
            ..LibraryState::default()
        };
        lib.release_timestamp = Some(
            DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let json = serde_json::to_string(&lib).unwrap();
        assert!(json.contains("\"releaseTimestamp\":\"2025-01-02T03:04:05Z\""));
    }
}
