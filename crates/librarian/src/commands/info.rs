//! Info command: show package, configuration and library information.

use anyhow::anyhow;
use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use librarian_core::collab::StateStore;
use librarian_core::config::{self, Config};
use librarian_core::git::GitRepo;
use librarian_core::state::{AutomationLevel, JsonStateStore, LibraryState, PipelineState};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    /// Only show this library from the state file
    #[arg(long, value_name = "ID")]
    pub library: Option<String>,
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    state_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes_dir: Option<String>,
    skip_build: bool,
    branch_prefix: String,
    remote: String,
    review_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prepare_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_command: Option<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &Utf8Path, root: &Utf8Path) -> Self {
        let commands = config.commands();
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str(),
            log_dir: config.log_dir.as_ref().map(ToString::to_string),
            state_file: config.state_path_in(root).to_string(),
            notes_dir: config.notes_dir().map(|p| p.to_string()),
            skip_build: config.skip_build(),
            branch_prefix: config.branch_prefix().to_string(),
            remote: config.remote().to_string(),
            review_label: config.review_label().to_string(),
            prepare_command: commands.prepare,
            build_command: commands.build,
        }
    }
}

#[derive(Serialize)]
struct LibraryInfo {
    id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_version: Option<String>,
    blocked: bool,
}

impl From<&LibraryState> for LibraryInfo {
    fn from(lib: &LibraryState) -> Self {
        Self {
            id: lib.id.clone(),
            current_version: lib.current_version.clone(),
            next_version: lib.next_version.clone(),
            blocked: lib.release_automation_level == AutomationLevel::Blocked,
        }
    }
}

/// Libraries to report: all of them, or only `only` if given.
///
/// Returns `None` when `only` names a library the state does not have.
fn library_infos(state: &PipelineState, only: Option<&str>) -> Option<Vec<LibraryInfo>> {
    match only {
        Some(id) => state.library(id).map(|lib| vec![LibraryInfo::from(lib)]),
        None => Some(state.libraries.iter().map(LibraryInfo::from).collect()),
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    libraries: Option<Vec<LibraryInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_error: Option<String>,
}

/// Print package, configuration and library information.
///
/// The library list comes from the state file at the repository root (or
/// `cwd` outside a repository), when one can be read.
#[instrument(name = "cmd_info", skip_all)]
pub fn cmd_info(
    args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, library = ?args.library, "executing info command");

    let root = GitRepo::discover(cwd)
        .map(|repo| repo.root().to_path_buf())
        .unwrap_or_else(|_| cwd.to_path_buf());
    let config_info = ConfigInfo::from_config(config, cwd, &root);
    let store = JsonStateStore::new(config.state_path_in(&root));
    let (libraries, state_error) = if store.path().is_file() {
        match store.load() {
            Ok(state) => {
                let libraries = library_infos(&state, args.library.as_deref()).ok_or_else(|| {
                    anyhow!(
                        "library `{}` not found in {}",
                        args.library.as_deref().unwrap_or_default(),
                        store.path()
                    )
                })?;
                (Some(libraries), None)
            }
            Err(e) => (None, Some(e.to_string())),
        }
    } else {
        (None, None)
    };

    let info = FullInfo {
        package: PackageInfo::new(),
        config: config_info,
        libraries,
        state_error,
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let package = &info.package;
    println!("{} {}", package.name.bold(), package.version.green());
    if !package.description.is_empty() {
        println!("{}", package.description);
    }
    if !package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), package.license);
    }
    if !package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), package.repository.cyan());
    }

    let cfg = &info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    match &cfg.config_file {
        Some(path) => println!("{}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("{}: {}", "Config file".dimmed(), "none loaded".yellow()),
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(dir) = &cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "State file".dimmed(), cfg.state_file);
    if let Some(dir) = &cfg.notes_dir {
        println!("{}: {}", "Notes directory".dimmed(), dir);
    }
    println!(
        "{}: {}/{}-<timestamp>",
        "Release branch".dimmed(),
        cfg.remote,
        cfg.branch_prefix
    );
    println!("{}: {}", "Review label".dimmed(), cfg.review_label);
    for (label, command) in [
        ("Prepare command", &cfg.prepare_command),
        ("Build command", &cfg.build_command),
    ] {
        match command {
            Some(cmd) => println!("{}: {}", label.dimmed(), cmd.cyan()),
            None => println!("{}: {}", label.dimmed(), "not configured".yellow()),
        }
    }
    if cfg.skip_build {
        println!("{}: {}", "Builds".dimmed(), "skipped".yellow());
    }

    println!();
    println!("{}", "Libraries".bold().underline());
    match (&info.libraries, &info.state_error) {
        (Some(libraries), _) if libraries.is_empty() => {
            println!("  {}", "none configured".yellow());
        }
        (Some(libraries), _) => {
            for lib in libraries {
                let version = if lib.current_version.is_empty() {
                    "unreleased".dimmed().to_string()
                } else {
                    lib.current_version.green().to_string()
                };
                print!("  {} {version}", lib.id.bold());
                if let Some(next) = &lib.next_version {
                    print!(" {}", format!("(next: {next})").cyan());
                }
                if lib.blocked {
                    print!(" {}", "blocked".red());
                }
                println!();
            }
        }
        (None, Some(err)) => println!("  {} {}", "✗".red(), err.red()),
        (None, None) => println!("  {}", "no state file found".yellow()),
    }

    Ok(())
}
