//! Turning a run outcome into a single action.

use crate::release::RunOutcome;

/// What to do with the result of a release run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing was released and nothing failed.
    DoNothing,
    /// Nothing was released but some libraries failed; the run must fail
    /// loudly so the errors are not lost.
    AbortWithError(String),
    /// Publish a change with this body.
    PublishChange(String),
    /// Publish a change with this body and hold it for manual review.
    PublishFlaggedChange(String),
}

/// Decide what to do with a run's outcome.
///
/// | releases | errors | action |
/// |---|---|---|
/// | no | no | [`Action::DoNothing`] |
/// | no | yes | [`Action::AbortWithError`] |
/// | yes | no | [`Action::PublishChange`] |
/// | yes | yes | [`Action::PublishFlaggedChange`] |
///
/// A flagged body lists the errors, a blank line, then the releases.
pub fn summarize(outcome: &RunOutcome) -> Action {
    let releases = outcome.releases.join("\n");
    let errors = outcome.errors.join("\n");
    match (outcome.releases.is_empty(), outcome.errors.is_empty()) {
        (true, true) => Action::DoNothing,
        (true, false) => Action::AbortWithError(errors),
        (false, true) => Action::PublishChange(releases),
        (false, false) => Action::PublishFlaggedChange(format!("{errors}\n\n{releases}")),
    }
}
