//! Repository-specific release tooling.
//!
//! Each language repository brings its own commands for preparing a
//! release (bumping version files, writing changelogs) and for building and
//! testing a library. They are configured as shell command templates and run
//! through `sh -c` in the repository root.
//!
//! # Variables
//!
//! Templates support `{var}` interpolation for:
//! `{library_id}`, `{version}`, `{notes_path}`, `{repo_root}`.
//! Unknown placeholders are left untouched.

use std::process::Command;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::collab::{LibraryBuilder, PrepareRequest, ReleasePreparer};
use crate::config::CommandsConfig;

/// Errors from external release tooling.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No command is configured for a step.
    #[error("no command configured for `{key}`")]
    NotConfigured {
        /// The config key that is missing (e.g., "commands.build").
        key: &'static str,
    },

    /// The program is not installed or not on `PATH`.
    #[error("`{program}` not found on PATH")]
    NotFound {
        /// The missing program.
        program: String,
    },

    /// Failed to spawn the command.
    #[error("failed to execute `{command}`: {source}")]
    Exec {
        /// The command line.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("`{command}` failed (exit code {exit_code:?}): {stderr}")]
    CommandFailed {
        /// The command line.
        command: String,
        /// The exit code, if available.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// A git operation failed while talking to the code host.
    #[error(transparent)]
    Git(#[from] crate::git::GitError),
}

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Values available for interpolation in command templates.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Library being processed.
    pub library_id: String,
    /// Target version; empty for builds.
    pub version: String,
    /// Release notes file; empty for builds.
    pub notes_path: String,
    /// Repository root.
    pub repo_root: String,
}

/// Replace `{var}` placeholders with values from the context.
pub fn interpolate(template: &str, context: &CommandContext) -> String {
    template
        .replace("{library_id}", &context.library_id)
        .replace("{version}", &context.version)
        .replace("{notes_path}", &context.notes_path)
        .replace("{repo_root}", &context.repo_root)
}

/// Runs configured prepare and build commands.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    root: Utf8PathBuf,
    prepare: Option<String>,
    build: Option<String>,
}

impl CommandRunner {
    /// Create a runner for the repository at `root`.
    pub fn new(root: impl Into<Utf8PathBuf>, commands: &CommandsConfig) -> Self {
        Self {
            root: root.into(),
            prepare: commands.prepare.clone(),
            build: commands.build.clone(),
        }
    }

    fn context(&self, library_id: &str) -> CommandContext {
        CommandContext {
            library_id: library_id.to_string(),
            repo_root: self.root.to_string(),
            ..CommandContext::default()
        }
    }
}

impl ReleasePreparer for CommandRunner {
    #[instrument(skip_all, fields(library_id = request.library_id, version = request.version))]
    fn prepare_release(&self, request: &PrepareRequest<'_>) -> ToolResult<()> {
        let template = self.prepare.as_deref().ok_or(ToolError::NotConfigured {
            key: "commands.prepare",
        })?;
        let context = CommandContext {
            version: request.version.to_string(),
            notes_path: request.notes_path.to_string(),
            ..self.context(request.library_id)
        };
        run_shell(&interpolate(template, &context), &self.root)?;
        Ok(())
    }
}

impl LibraryBuilder for CommandRunner {
    #[instrument(skip(self))]
    fn build_library(&self, library_id: &str) -> ToolResult<()> {
        let template = self.build.as_deref().ok_or(ToolError::NotConfigured {
            key: "commands.build",
        })?;
        run_shell(&interpolate(template, &self.context(library_id)), &self.root)?;
        Ok(())
    }
}

/// Run a command line through `sh -c`, returning its stdout.
pub(crate) fn run_shell(command: &str, cwd: &Utf8Path) -> ToolResult<String> {
    run_program("sh", &["-c", command], cwd)
}

/// Run a program with arguments in `cwd`, returning its stdout.
pub(crate) fn run_program(program: &str, args: &[&str], cwd: &Utf8Path) -> ToolResult<String> {
    let command_line = display_command(program, args);
    which::which(program).map_err(|_| ToolError::NotFound {
        program: program.to_string(),
    })?;

    debug!(command = %command_line, %cwd, "running");
    let start = Instant::now();
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd.as_std_path())
        .output()
        .map_err(|source| ToolError::Exec {
            command: command_line.clone(),
            source,
        })?;
    debug!(
        command = %command_line,
        elapsed_ms = start.elapsed().as_millis() as u64,
        success = output.status.success(),
        "finished"
    );

    if !output.status.success() {
        return Err(ToolError::CommandFailed {
            command: command_line,
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// The command line as shown in logs and errors.
fn display_command(program: &str, args: &[&str]) -> String {
    match args {
        ["-c", script] if program == "sh" => (*script).to_string(),
        _ => std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" "),
    }
}
