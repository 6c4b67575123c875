//! Configuration loading and discovery.
//!
//! Configuration is merged from, highest precedence first:
//! - explicit files passed with `--config`
//! - `.librarian.<ext>` or `librarian.<ext>` in the current directory or any
//!   parent, stopping at the repository root (`.git`)
//! - `~/.config/librarian/config.<ext>` (user config)
//! - built-in defaults
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use librarian_core::config::ConfigLoader;
//!
//! let cwd = Utf8PathBuf::from("/src/google-cloud-go");
//! let config = ConfigLoader::new().with_project_search(&cwd).load().unwrap();
//! println!("state file: {}", config.state_path());
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::state::DEFAULT_STATE_PATH;

/// Branch prefix for release changes when none is configured.
pub const DEFAULT_BRANCH_PREFIX: &str = "librarian-release";

/// Label that keeps a flagged release change from being merged.
pub const DEFAULT_REVIEW_LABEL: &str = "do not merge";

/// Remote that release branches are pushed to.
pub const DEFAULT_REMOTE: &str = "origin";

/// The configuration for librarian.
///
/// Every section is optional; accessors on [`Config`] fill in defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Where the pipeline state lives.
    pub state: Option<StateConfig>,
    /// Release run behavior.
    pub release: Option<ReleaseConfig>,
    /// Repository-specific release tooling.
    pub commands: Option<CommandsConfig>,
}

/// Pipeline state location.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StateConfig {
    /// State file, relative to the repository root unless absolute.
    pub path: Option<Utf8PathBuf>,
}

/// Release run configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// Skip building and testing libraries (default: `false`).
    pub skip_build: Option<bool>,
    /// Directory release notes files are written to.
    ///
    /// Defaults to `release-notes` under the user cache directory, so the
    /// files survive the working tree being reset between libraries.
    pub notes_dir: Option<Utf8PathBuf>,
    /// Prefix of the branch the release change is pushed to.
    pub branch_prefix: Option<String>,
    /// Label applied to release changes that need manual review.
    pub review_label: Option<String>,
    /// Remote the release branch is pushed to.
    pub remote: Option<String>,
}

/// Command templates run for each library.
///
/// Templates are run with `sh -c` in the repository root. See
/// [`tools`](crate::tools) for the available `{var}` placeholders.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandsConfig {
    /// Prepares a release: updates version files and changelogs.
    pub prepare: Option<String>,
    /// Builds and tests one library.
    pub build: Option<String>,
}

impl Config {
    /// The state file path, resolved against `root` when relative.
    pub fn state_path_in(&self, root: &Utf8Path) -> Utf8PathBuf {
        root.join(self.state_path())
    }

    /// The configured state file path, or the default.
    pub fn state_path(&self) -> Utf8PathBuf {
        self.state
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_STATE_PATH))
    }

    /// Whether builds are skipped unless overridden on the command line.
    pub fn skip_build(&self) -> bool {
        self.release
            .as_ref()
            .and_then(|r| r.skip_build)
            .unwrap_or(false)
    }

    /// Directory release notes are written to.
    ///
    /// Returns `None` when neither a configured directory nor a user cache
    /// directory is available.
    pub fn notes_dir(&self) -> Option<Utf8PathBuf> {
        self.release
            .as_ref()
            .and_then(|r| r.notes_dir.clone())
            .or_else(|| user_cache_dir().map(|dir| dir.join("release-notes")))
    }

    /// Prefix of release branch names.
    pub fn branch_prefix(&self) -> &str {
        self.release
            .as_ref()
            .and_then(|r| r.branch_prefix.as_deref())
            .unwrap_or(DEFAULT_BRANCH_PREFIX)
    }

    /// Label for release changes that need manual review.
    pub fn review_label(&self) -> &str {
        self.release
            .as_ref()
            .and_then(|r| r.review_label.as_deref())
            .unwrap_or(DEFAULT_REVIEW_LABEL)
    }

    /// Remote release branches are pushed to.
    pub fn remote(&self) -> &str {
        self.release
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or(DEFAULT_REMOTE)
    }

    /// Command templates, empty when the section is missing.
    pub fn commands(&self) -> CommandsConfig {
        self.commands.clone().unwrap_or_default()
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Config file extensions, in lookup order.
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Name used for config files and platform directories.
const APP_NAME: &str = "librarian";

/// Builder that merges configuration from every source.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    search_root: Option<Utf8PathBuf>,
    user_config: bool,
    /// Directory entry that marks the top of the search (`.git`).
    boundary: Option<String>,
    files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// A loader that reads user config and stops at the repository root.
    pub fn new() -> Self {
        Self {
            search_root: None,
            user_config: true,
            boundary: Some(".git".to_string()),
            files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config file.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Whether to read `~/.config/librarian/config.<ext>`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.user_config = include;
        self
    }

    /// Stop the upward search at a parent directory containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary = None;
        self
    }

    /// Merge an explicit file on top of everything discovered.
    ///
    /// Later files win over earlier ones.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Every config file this loader would merge, lowest precedence first.
    pub fn sources(&self) -> Vec<Utf8PathBuf> {
        let user = self.user_config.then(find_user_config).flatten();
        let project = self
            .search_root
            .as_deref()
            .and_then(|root| self.find_project_config(root));
        user.into_iter()
            .chain(project)
            .chain(self.files.iter().cloned())
            .collect()
    }

    /// Merge defaults, user config, project config and explicit files.
    #[tracing::instrument(skip(self), fields(search_root = ?self.search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        let sources = self.sources();
        tracing::debug!(?sources, "loading configuration");

        let figment = sources.iter().fold(
            Figment::new().merge(Serialized::defaults(Config::default())),
            |figment, path| merge_file(figment, path),
        );
        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;

        tracing::info!(
            log_level = config.log_level.as_str(),
            files = sources.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Like [`load`](Self::load), but fails when no config file exists.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        if self.sources().is_empty() {
            return Err(ConfigError::NotFound);
        }
        self.load()
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            if dir != start
                && let Some(marker) = &self.boundary
                && dir.join(marker).exists()
            {
                break;
            }
            let found = CONFIG_EXTENSIONS.iter().find_map(|ext| {
                [
                    dir.join(format!(".{APP_NAME}.{ext}")),
                    dir.join(format!("{APP_NAME}.{ext}")),
                ]
                .into_iter()
                .find(|candidate| candidate.is_file())
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

/// Merge one file, picking the format from its extension (TOML otherwise).
fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// The project config file that applies to `start`, if any.
///
/// Unlike [`ConfigLoader`], this does not stop at the repository root.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .without_boundary_marker()
        .find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

fn utf8(path: &std::path::Path) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).ok()
}

/// User config directory (`~/.config/librarian` on Linux).
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    utf8(project_dirs()?.config_dir())
}

/// User cache directory (`~/.cache/librarian` on Linux).
///
/// Release notes default to a subdirectory of this.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    utf8(project_dirs()?.cache_dir())
}

/// Machine-local data directory (`~/.local/share/librarian` on Linux).
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    utf8(project_dirs()?.data_local_dir())
}
