//! Release-worthiness evaluation.

use crate::commits::ClassifiedCommit;

/// Decide whether `library_id` should be released given its commits.
///
/// Explicit opt-out (`No-Trigger-Release`) wins over everything, then
/// explicit opt-in (`Trigger-Release`), then the presence of any feature,
/// fix, or breaking change.
pub fn is_release_worthy(commits: &[ClassifiedCommit], library_id: &str) -> bool {
    let named = |ids: &[String]| ids.iter().any(|id| id == library_id);

    if commits.iter().any(|c| named(&c.no_trigger_libraries)) {
        return false;
    }
    if commits.iter().any(|c| named(&c.trigger_libraries)) {
        return true;
    }
    commits.iter().any(ClassifiedCommit::has_release_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_features() -> ClassifiedCommit {
        ClassifiedCommit {
            features: vec!["add foo".into()],
            ..ClassifiedCommit::default()
        }
    }

    #[test]
    fn no_commits_is_not_worthy() {
        assert!(!is_release_worthy(&[], "storage"));
    }

    #[test]
    fn feature_is_worthy() {
        assert!(is_release_worthy(&[with_features()], "storage"));
    }

    #[test]
    fn fix_is_worthy() {
        let c = ClassifiedCommit {
            fixes: vec!["bar".into()],
            ..ClassifiedCommit::default()
        };
        assert!(is_release_worthy(&[c], "storage"));
    }

    #[test]
    fn breaking_alone_is_worthy() {
        let c = ClassifiedCommit {
            breaking: true,
            ..ClassifiedCommit::default()
        };
        assert!(is_release_worthy(&[c], "storage"));
    }

    #[test]
    fn docs_alone_are_not_worthy() {
        let c = ClassifiedCommit {
            docs: vec!["typo".into()],
            ..ClassifiedCommit::default()
        };
        assert!(!is_release_worthy(&[c], "storage"));
    }

    #[test]
    fn no_trigger_beats_features() {
        let opt_out = ClassifiedCommit {
            no_trigger_libraries: vec!["storage".into()],
            ..ClassifiedCommit::default()
        };
        assert!(!is_release_worthy(&[with_features(), opt_out], "storage"));
    }

    #[test]
    fn no_trigger_beats_trigger() {
        let c = ClassifiedCommit {
            trigger_libraries: vec!["storage".into()],
            no_trigger_libraries: vec!["storage".into()],
            ..ClassifiedCommit::default()
        };
        assert!(!is_release_worthy(&[c], "storage"));
    }

    #[test]
    fn trigger_forces_release() {
        let c = ClassifiedCommit {
            trigger_libraries: vec!["storage".into()],
            ..ClassifiedCommit::default()
        };
        assert!(is_release_worthy(&[c], "storage"));
    }

    #[test]
    fn footers_for_other_libraries_are_ignored() {
        let c = ClassifiedCommit {
            trigger_libraries: vec!["pubsub".into()],
            ..ClassifiedCommit::default()
        };
        assert!(!is_release_worthy(&[c], "storage"));

        let opt_out_other = ClassifiedCommit {
            no_trigger_libraries: vec!["pubsub".into()],
            ..ClassifiedCommit::default()
        };
        assert!(is_release_worthy(&[with_features(), opt_out_other], "storage"));
    }
}
