//! Property-based tests for chronicle-core classification.
//!
//! These tests use proptest to check the acceptance laws of
//! [`ClassificationRule`] across many generated paths.

use proptest::prelude::*;

use crate::path::has_file_extension;
use crate::{ClassificationRule, ASSET_RULE, PAGE_RULE};

/// Strategy for a single path segment without dots or slashes.
fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,12}"
}

/// Strategy for a file extension.
fn extension_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,5}"
}

/// Strategy for relative paths of one to five segments.
fn relative_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..5).prop_map(|segments| segments.join("/"))
}

/// Strategy for the excluded substrings of both preset rules.
fn excluded_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("/jcr:content"),
        Just("/renditions"),
        Just("/metadata"),
        Just("/related"),
        Just("/_jcr"),
        Just("/tags"),
    ]
}

/// Strategy for roots that are not under `/content/`.
fn foreign_root_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("/conf/"),
        Just("/apps/"),
        Just("/var/"),
        Just("/etc/"),
        Just("content/"),
        Just("/contents/"),
    ]
}

proptest! {
    #[test]
    fn prefix_mismatch_is_rejected(root in foreign_root_strategy(), rest in relative_path_strategy(), ext in extension_strategy()) {
        let path = format!("{root}{rest}.{ext}");
        prop_assert!(!ASSET_RULE.accept(&path));
        prop_assert!(!PAGE_RULE.accept(&path));
    }

    #[test]
    fn excluded_substring_is_rejected(
        head in relative_path_strategy(),
        excluded in excluded_strategy(),
        tail in relative_path_strategy(),
        ext in extension_strategy(),
    ) {
        let path = format!("/content/dam/{head}{excluded}/{tail}.{ext}");
        let asset_excluded = ASSET_RULE.excluded_substrings.iter().any(|s| s == excluded);
        let page_excluded = PAGE_RULE.excluded_substrings.iter().any(|s| s == excluded);

        if asset_excluded {
            prop_assert!(!ASSET_RULE.accept(&path));
        }
        if page_excluded {
            prop_assert!(!PAGE_RULE.accept(&path));
        }
    }

    #[test]
    fn files_under_dam_are_accepted(rest in relative_path_strategy(), ext in extension_strategy()) {
        let path = format!("/content/dam/{rest}.{ext}");
        prop_assume!(!ASSET_RULE.excluded_substrings.iter().any(|s| path.contains(s.as_str())));
        prop_assert!(ASSET_RULE.accept(&path));
    }

    #[test]
    fn folders_fail_extension_rule(rest in relative_path_strategy()) {
        let path = format!("/content/dam/{rest}");
        prop_assert!(!has_file_extension(&path));
        prop_assert!(!ASSET_RULE.accept(&path));
    }

    #[test]
    fn extension_rule_matches_last_segment(
        rest in relative_path_strategy(),
        stem in segment_strategy(),
        ext in extension_strategy(),
    ) {
        let with_ext = format!("/content/{rest}/{stem}.{ext}");
        let with_dir_ext = format!("/content/{rest}.{ext}/{stem}");
        prop_assert!(has_file_extension(&with_ext));
        prop_assert!(!has_file_extension(&with_dir_ext));
    }

    #[test]
    fn rule_without_constraints_accepts_prefixed(rest in "[ -~]{0,40}") {
        let rule = ClassificationRule::new("/content/");
        let path = format!("/content/{rest}");
        prop_assert!(rule.accept(&path));
    }
}
