//! Release notes and release descriptions.
//!
//! Notes are a small markdown document with up to three sections, built
//! from the classified commits of one library. They are written to a file
//! so that the repository's release tooling can fold them into its own
//! changelog.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, instrument};

use crate::commits::ClassifiedCommit;

/// Notes text used when no commit contributed a feature, fix, or doc line.
pub const FALLBACK_NOTES: &str =
    "No user-visible changes were found in the commit history for this release.";

/// Format release notes for a library's commits.
///
/// Sections appear in a fixed order and only when non-empty:
/// new features, bug fixes, documentation improvements.
pub fn format_release_notes(commits: &[ClassifiedCommit]) -> String {
    let sections: [(&str, Vec<&str>); 3] = [
        ("New features", collect(commits, |c| &c.features)),
        ("Bug fixes", collect(commits, |c| &c.fixes)),
        ("Documentation improvements", collect(commits, |c| &c.docs)),
    ];

    let rendered: Vec<String> = sections
        .iter()
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(title, entries)| {
            let bullets: Vec<String> = entries.iter().map(|e| format!("- {e}")).collect();
            format!("### {title}\n\n{}\n", bullets.join("\n"))
        })
        .collect();

    if rendered.is_empty() {
        FALLBACK_NOTES.to_string()
    } else {
        rendered.join("\n")
    }
}

fn collect<'a>(
    commits: &'a [ClassifiedCommit],
    field: impl Fn(&'a ClassifiedCommit) -> &'a Vec<String>,
) -> Vec<&'a str> {
    commits
        .iter()
        .flat_map(|c| field(c).iter().map(String::as_str))
        .collect()
}

/// One-line description of a library release.
pub fn release_description(library_id: &str, version: &str) -> String {
    format!("Release library: {library_id} version {version}")
}

/// File name for a library's release notes.
pub fn release_notes_file_name(library_id: &str, version: &str) -> String {
    format!("{library_id}-{version}-release-notes.txt")
}

/// Write release notes into `dir`, creating it if needed.
///
/// Returns the path of the written file.
#[instrument(skip(notes))]
pub fn write_release_notes(
    dir: &Utf8Path,
    library_id: &str,
    version: &str,
    notes: &str,
) -> std::io::Result<Utf8PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(release_notes_file_name(library_id, version));
    std::fs::write(&path, notes)?;
    debug!(%path, "wrote release notes");
    Ok(path)
}
