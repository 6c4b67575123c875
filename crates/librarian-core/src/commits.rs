//! Conventional-commit classification.
//!
//! Turns a raw commit message into a [`ClassifiedCommit`]. Classification is
//! a pure function of the message text and never fails: lines that don't
//! match a footer prefix or a known commit type are dropped.

use serde::{Deserialize, Serialize};

/// Footer carrying the upstream Piper change id.
pub const PIPER_ORIGIN_PREFIX: &str = "PiperOrigin-RevId:";
/// Footer carrying a link to the source change.
pub const SOURCE_LINK_PREFIX: &str = "Source-Link:";
/// Footer naming a library that must be released regardless of content.
pub const TRIGGER_RELEASE_PREFIX: &str = "Trigger-Release:";
/// Footer naming a library that must not be released from this batch.
pub const NO_TRIGGER_RELEASE_PREFIX: &str = "No-Trigger-Release:";

/// A commit as supplied by the commit source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit hash.
    pub hash: String,
    /// Raw, possibly multi-line, commit message.
    pub message: String,
}

impl Commit {
    /// Create a commit from a hash and message.
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
        }
    }
}

/// The structured view of a single commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCommit {
    /// Descriptions of `feat:` lines, in message order.
    pub features: Vec<String>,
    /// Descriptions of `fix:` / `fixes:` lines.
    pub fixes: Vec<String>,
    /// Descriptions of `doc:` / `docs:` lines.
    pub docs: Vec<String>,
    /// Whether any conventional line carried a `!` marker.
    pub breaking: bool,
    /// `PiperOrigin-RevId:` footer values.
    pub piper_origins: Vec<String>,
    /// `Source-Link:` footer values.
    pub source_links: Vec<String>,
    /// Libraries explicitly forced into a release.
    pub trigger_libraries: Vec<String>,
    /// Libraries explicitly excluded from a release.
    pub no_trigger_libraries: Vec<String>,
    /// Hash of the commit this classification came from.
    pub commit_hash: String,
}

impl ClassifiedCommit {
    /// Whether this commit carries user-visible change on its own.
    pub const fn has_release_content(&self) -> bool {
        self.breaking || !self.features.is_empty() || !self.fixes.is_empty()
    }
}

/// Which list a conventional commit type feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Feature,
    Fix,
    Docs,
}

impl Category {
    fn from_type(commit_type: &str) -> Option<Self> {
        match commit_type {
            "feat" => Some(Self::Feature),
            "fix" | "fixes" => Some(Self::Fix),
            "doc" | "docs" => Some(Self::Docs),
            // chore, refactor, test(s), deps, tools and anything unknown
            _ => None,
        }
    }
}

/// Classify a commit message line by line.
pub fn classify(commit: &Commit) -> ClassifiedCommit {
    let mut classified = ClassifiedCommit {
        commit_hash: commit.hash.clone(),
        ..ClassifiedCommit::default()
    };

    for line in commit.message.lines() {
        if take_footer(line, &mut classified) {
            continue;
        }

        let Some((prefix, description)) = line.split_once(':') else {
            continue;
        };

        let commit_type = if prefix.contains('!') {
            classified.breaking = true;
            prefix.replace('!', "")
        } else {
            prefix.to_string()
        };
        let commit_type = commit_type
            .split_once('(')
            .map_or(commit_type.as_str(), |(bare, _)| bare)
            .trim();

        let description = description.trim().to_string();
        match Category::from_type(commit_type) {
            Some(Category::Feature) => classified.features.push(description),
            Some(Category::Fix) => classified.fixes.push(description),
            Some(Category::Docs) => classified.docs.push(description),
            None => {}
        }
    }

    classified
}

/// Classify every commit, preserving order.
pub fn classify_all(commits: &[Commit]) -> Vec<ClassifiedCommit> {
    commits.iter().map(classify).collect()
}

/// Record `line` as a footer if it starts with a known footer prefix.
fn take_footer(line: &str, classified: &mut ClassifiedCommit) -> bool {
    let footers: [(&str, &mut Vec<String>); 4] = [
        (PIPER_ORIGIN_PREFIX, &mut classified.piper_origins),
        (SOURCE_LINK_PREFIX, &mut classified.source_links),
        (TRIGGER_RELEASE_PREFIX, &mut classified.trigger_libraries),
        (NO_TRIGGER_RELEASE_PREFIX, &mut classified.no_trigger_libraries),
    ];

    for (prefix, target) in footers {
        if let Some(value) = line.strip_prefix(prefix) {
            target.push(value.trim().to_string());
            return true;
        }
    }
    false
}
