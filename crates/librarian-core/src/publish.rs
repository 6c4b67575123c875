//! Acting on a run summary.
//!
//! [`publish`] maps an [`Action`] onto calls to a [`Publisher`]. Branch and
//! title naming live here too so every publisher names changes the same way.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};

use crate::collab::Publisher;
use crate::summary::Action;
use crate::tools::ToolError;

/// Errors from publishing a release change.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The run released nothing and at least one library failed.
    #[error("release run failed:\n{0}")]
    LibraryFailures(String),

    /// The change could not be created.
    #[error("failed to create release change: {0}")]
    Create(#[source] ToolError),

    /// The change was created but could not be flagged for review.
    #[error("created release change {change_id} but failed to flag it for review: {source}")]
    Flag {
        /// The change that was created.
        change_id: String,
        /// Underlying error.
        source: ToolError,
    },
}

/// Result alias for publishing.
pub type PublishResult<T> = Result<T, PublishError>;

/// Where and under what title a release change is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Branch the release commits are pushed to.
    pub branch: String,
    /// Title of the change.
    pub title: String,
}

impl PublishRequest {
    /// Name a release change created at `at`.
    pub fn new(branch_prefix: &str, at: DateTime<Utc>) -> Self {
        Self {
            branch: branch_name(branch_prefix, at),
            title: change_title(at),
        }
    }

    /// Name a release change created now.
    pub fn now(branch_prefix: &str) -> Self {
        Self::new(branch_prefix, Utc::now())
    }
}

/// `<prefix>-<timestamp>`, with a compact UTC timestamp.
pub fn branch_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}-{}", at.format("%Y%m%dT%H%M%SZ"))
}

/// Title of a release change.
pub fn change_title(at: DateTime<Utc>) -> String {
    format!(
        "chore: librarian release pull request: {}",
        at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Carry out `action`, returning the id of the created change, if any.
#[instrument(skip_all, fields(branch = %request.branch))]
pub fn publish(
    action: &Action,
    publisher: &dyn Publisher,
    request: &PublishRequest,
) -> PublishResult<Option<String>> {
    match action {
        Action::DoNothing => {
            info!("nothing to publish");
            Ok(None)
        }
        Action::AbortWithError(errors) => Err(PublishError::LibraryFailures(errors.clone())),
        Action::PublishChange(body) => create(publisher, request, body).map(Some),
        Action::PublishFlaggedChange(body) => {
            let change_id = create(publisher, request, body)?;
            publisher
                .flag_for_manual_review(&change_id)
                .map_err(|source| PublishError::Flag {
                    change_id: change_id.clone(),
                    source,
                })?;
            info!(%change_id, "flagged for manual review");
            Ok(Some(change_id))
        }
    }
}

fn create(publisher: &dyn Publisher, request: &PublishRequest, body: &str) -> PublishResult<String> {
    let change_id = publisher
        .create_change(&request.branch, &request.title, body)
        .map_err(PublishError::Create)?;
    info!(%change_id, "created release change");
    Ok(change_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolResult;
    use chrono::TimeZone;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingPublisher {
        calls: RefCell<Vec<String>>,
        fail_create: bool,
    }

    impl Publisher for RecordingPublisher {
        fn create_change(&self, branch: &str, title: &str, body: &str) -> ToolResult<String> {
            if self.fail_create {
                return Err(ToolError::NotFound {
                    program: "gh".into(),
                });
            }
            self.calls
                .borrow_mut()
                .push(format!("create {branch} | {title} | {body}"));
            Ok("https://example.com/pull/7".into())
        }

        fn flag_for_manual_review(&self, change_id: &str) -> ToolResult<()> {
            self.calls.borrow_mut().push(format!("flag {change_id}"));
            Ok(())
        }
    }

    fn request() -> PublishRequest {
        PublishRequest::new(
            "librarian-release",
            Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
        )
    }

    #[test]
    fn names_branch_and_title_from_timestamp() {
        let request = request();
        assert_eq!(request.branch, "librarian-release-20250304T050607Z");
        assert_eq!(
            request.title,
            "chore: librarian release pull request: 20250304T050607Z"
        );
    }

    #[test]
    fn do_nothing_publishes_nothing() {
        let publisher = RecordingPublisher::default();
        let result = publish(&Action::DoNothing, &publisher, &request()).unwrap();
        assert_eq!(result, None);
        assert!(publisher.calls.borrow().is_empty());
    }

    #[test]
    fn abort_is_an_error() {
        let publisher = RecordingPublisher::default();
        let err = publish(
            &Action::AbortWithError("failed to build for c: boom".into()),
            &publisher,
            &request(),
        )
        .unwrap_err();
        assert!(matches!(err, PublishError::LibraryFailures(ref e) if e.contains("boom")));
        assert!(publisher.calls.borrow().is_empty());
    }

    #[test]
    fn plain_change_is_not_flagged() {
        let publisher = RecordingPublisher::default();
        let id = publish(
            &Action::PublishChange("Release library: a version 1.1.0".into()),
            &publisher,
            &request(),
        )
        .unwrap();
        assert_eq!(id.as_deref(), Some("https://example.com/pull/7"));
        assert_eq!(
            *publisher.calls.borrow(),
            vec![
                "create librarian-release-20250304T050607Z | \
                 chore: librarian release pull request: 20250304T050607Z | \
                 Release library: a version 1.1.0"
                    .to_string()
            ]
        );
    }

    #[test]
    fn flagged_change_is_created_then_flagged() {
        let publisher = RecordingPublisher::default();
        publish(
            &Action::PublishFlaggedChange("err\n\nrel".into()),
            &publisher,
            &request(),
        )
        .unwrap();
        let calls = publisher.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("create "));
        assert_eq!(calls[1], "flag https://example.com/pull/7");
    }

    #[test]
    fn create_failure_skips_flagging() {
        let publisher = RecordingPublisher {
            fail_create: true,
            ..RecordingPublisher::default()
        };
        let err = publish(
            &Action::PublishFlaggedChange("err\n\nrel".into()),
            &publisher,
            &request(),
        )
        .unwrap_err();
        assert!(matches!(err, PublishError::Create(_)));
        assert!(publisher.calls.borrow().is_empty());
    }
}
