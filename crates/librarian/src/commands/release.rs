//! Release command: thin CLI layer over `librarian_core::release`.

use std::time::Duration;

use anyhow::{Context, bail};
use camino::Utf8Path;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use librarian_core::collab::{StateStore, WorkingTree};
use librarian_core::config::Config;
use librarian_core::git::GitRepo;
use librarian_core::github::GitHubPublisher;
use librarian_core::publish::{PublishRequest, publish};
use librarian_core::release::{
    LibraryOutcome, LibraryReport, ReleaseContext, ReleaseEvent, ReleaseOptions, run_release,
};
use librarian_core::state::JsonStateStore;
use librarian_core::summary::{Action, summarize};
use librarian_core::tools::CommandRunner;

/// Arguments for the `release` subcommand.
#[derive(Args, Debug, Default)]
pub struct ReleaseArgs {
    /// Skip building and testing libraries
    #[arg(long)]
    pub skip_build: bool,

    /// Commit releases locally without pushing or opening a pull request
    #[arg(long)]
    pub no_publish: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
struct LibraryLine {
    library: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl From<&LibraryReport> for LibraryLine {
    fn from(report: &LibraryReport) -> Self {
        let library = report.library_id.clone();
        match &report.outcome {
            LibraryOutcome::Released {
                version, commit, ..
            } => Self {
                library,
                status: "released",
                version: Some(version.clone()),
                commit: Some(commit.clone()),
                detail: None,
            },
            LibraryOutcome::Skipped { reason } => Self {
                library,
                status: "skipped",
                version: None,
                commit: None,
                detail: Some(reason.to_string()),
            },
            LibraryOutcome::Failed { error, .. } => Self {
                library,
                status: "failed",
                version: None,
                commit: None,
                detail: Some(error.clone()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ReleaseReport {
    libraries: Vec<LibraryLine>,
    releases: Vec<String>,
    errors: Vec<String>,
    action: &'static str,
    published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    change: Option<String>,
}

const fn action_name(action: &Action) -> &'static str {
    match action {
        Action::DoNothing => "nothing",
        Action::AbortWithError(_) => "abort",
        Action::PublishChange(_) => "publish",
        Action::PublishFlaggedChange(_) => "publish-flagged",
    }
}

/// Execute the release command.
#[instrument(name = "cmd_release", skip_all)]
pub fn cmd_release(
    args: ReleaseArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(
        json_output = global_json,
        skip_build = args.skip_build,
        no_publish = args.no_publish,
        "executing release command"
    );

    let repo = GitRepo::discover(cwd).context("failed to open git repository")?;
    if !repo.is_clean().context("failed to check working tree")? {
        bail!("working tree has uncommitted changes; commit or stash them before releasing");
    }

    let store = JsonStateStore::new(config.state_path_in(repo.root()));
    let state = store
        .load()
        .with_context(|| format!("failed to load pipeline state from {}", store.path()))?;
    let notes_dir = config
        .notes_dir()
        .context("no directory for release notes; set `release.notes_dir`")?;

    let runner = CommandRunner::new(repo.root(), &config.commands());
    let ctx = ReleaseContext {
        commits: &repo,
        preparer: &runner,
        builder: &runner,
        tree: &repo,
        store: &store,
    };
    let options = ReleaseOptions {
        skip_build: args.skip_build || config.skip_build(),
        notes_dir,
    };

    let mut progress = Progress::new(!global_json);
    let run = run_release(state, &ctx, &options, |event| progress.handle(event))
        .context("release run aborted")?;

    let action = summarize(&run.outcome);
    debug!(action = action_name(&action), "run summarized");

    let publishable = matches!(
        action,
        Action::PublishChange(_) | Action::PublishFlaggedChange(_)
    );
    let confirmed = !publishable
        || args.no_publish
        || args.yes
        || global_json
        || Confirm::new("Push release commits and open a pull request?")
            .with_default(true)
            .prompt()
            .context("confirmation prompt failed")?;

    let published = publishable && confirmed && !args.no_publish;
    let change = match &action {
        Action::AbortWithError(_) => None,
        _ if !published => None,
        _ => {
            let publisher =
                GitHubPublisher::new(repo.clone(), config.remote(), config.review_label());
            publish(&action, &publisher, &PublishRequest::now(config.branch_prefix()))
                .context("failed to publish release")?
        }
    };

    let report = ReleaseReport {
        libraries: run.libraries.iter().map(LibraryLine::from).collect(),
        releases: run.outcome.releases.clone(),
        errors: run.outcome.errors.clone(),
        action: action_name(&action),
        published,
        change,
    };
    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &action, publishable && !confirmed);
    }

    if let Action::AbortWithError(errors) = action {
        bail!("no library was released and {} failed:\n{errors}", run.outcome.errors.len());
    }
    Ok(())
}

/// Per-library spinner and result lines.
struct Progress {
    enabled: bool,
    spinner: Option<ProgressBar>,
}

impl Progress {
    const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            spinner: None,
        }
    }

    fn handle(&mut self, event: ReleaseEvent<'_>) {
        if !self.enabled {
            return;
        }
        match event {
            ReleaseEvent::LibraryStarted { library_id } => {
                let spinner = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
                    spinner.set_style(
                        style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                    );
                }
                spinner.set_message(format!("{library_id}..."));
                spinner.enable_steady_tick(Duration::from_millis(80));
                self.spinner = Some(spinner);
            }
            ReleaseEvent::LibraryFinished {
                library_id,
                outcome,
            } => {
                if let Some(spinner) = self.spinner.take() {
                    spinner.finish_and_clear();
                }
                print_library(library_id, outcome);
            }
        }
    }
}

fn print_library(library_id: &str, outcome: &LibraryOutcome) {
    match outcome {
        LibraryOutcome::Released { version, .. } => {
            println!("  {} {} {}", "✓".green(), library_id.bold(), version.green());
        }
        LibraryOutcome::Skipped { reason } => {
            println!(
                "  {} {} {}",
                "–".yellow(),
                library_id.bold(),
                format!("skipped: {reason}").dimmed()
            );
        }
        LibraryOutcome::Failed { error, .. } => {
            println!("  {} {} {}", "✗".red(), library_id.bold(), error.red());
        }
    }
}

fn print_summary(report: &ReleaseReport, action: &Action, declined: bool) {
    println!();
    let count = report.releases.len();
    let plural = if count == 1 { "" } else { "s" };
    match action {
        Action::DoNothing => println!("{}", "Nothing to release.".dimmed()),
        Action::AbortWithError(_) => {}
        _ if declined => println!(
            "{} Committed {count} release{plural} locally; publishing cancelled.",
            "○".yellow()
        ),
        _ if !report.published => println!(
            "{} Committed {count} release{plural} locally (not published).",
            "○".yellow()
        ),
        Action::PublishFlaggedChange(_) => println!(
            "{} Released {count} librar{} with {} failure{}; {} flagged for review",
            "!".yellow().bold(),
            if count == 1 { "y" } else { "ies" },
            report.errors.len(),
            if report.errors.len() == 1 { "" } else { "s" },
            report.change.as_deref().unwrap_or("change").cyan(),
        ),
        Action::PublishChange(_) => println!(
            "{} Released {count} librar{}: {}",
            "✓".green().bold(),
            if count == 1 { "y" } else { "ies" },
            report.change.as_deref().unwrap_or("change").cyan(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::release::{ReleaseStep, SkipReason};

    fn report(library_id: &str, outcome: LibraryOutcome) -> LibraryReport {
        LibraryReport {
            library_id: library_id.into(),
            outcome,
        }
    }

    #[test]
    fn action_names() {
        assert_eq!(action_name(&Action::DoNothing), "nothing");
        assert_eq!(action_name(&Action::AbortWithError("x".into())), "abort");
        assert_eq!(action_name(&Action::PublishChange("x".into())), "publish");
        assert_eq!(
            action_name(&Action::PublishFlaggedChange("x".into())),
            "publish-flagged"
        );
    }

    #[test]
    fn released_line_serializes_version_and_commit() {
        let line = LibraryLine::from(&report(
            "storage",
            LibraryOutcome::Released {
                version: "1.3.0".into(),
                description: "Release library: storage version 1.3.0".into(),
                commit: "abc123".into(),
            },
        ));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["status"], "released");
        assert_eq!(json["version"], "1.3.0");
        assert_eq!(json["commit"], "abc123");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn skipped_and_failed_lines_carry_detail() {
        let skipped = LibraryLine::from(&report(
            "pubsub",
            LibraryOutcome::Skipped {
                reason: SkipReason::Blocked,
            },
        ));
        assert_eq!(skipped.status, "skipped");
        assert_eq!(skipped.detail.as_deref(), Some("release automation blocked"));

        let failed = LibraryLine::from(&report(
            "spanner",
            LibraryOutcome::Failed {
                step: ReleaseStep::Build,
                error: "failed to build for spanner: exit 2".into(),
            },
        ));
        assert_eq!(failed.status, "failed");
        assert!(failed.version.is_none());
    }

    #[test]
    fn disabled_progress_ignores_events() {
        let mut progress = Progress::new(false);
        progress.handle(ReleaseEvent::LibraryStarted {
            library_id: "storage",
        });
        assert!(progress.spinner.is_none());
    }
}
