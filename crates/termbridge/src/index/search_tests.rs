// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use super::*;
use std::path::PathBuf;
use std::sync::Arc;

fn snapshot(entries: Vec<(&str, &str, bool)>) -> IndexSnapshot {
    IndexSnapshot {
        root: PathBuf::from("/root"),
        entries: Arc::new(
            entries
                .into_iter()
                .map(|(short, path, is_dir)| Entry {
                    short: short.to_string(),
                    path: path.to_string(),
                    is_dir,
                })
                .collect(),
        ),
    }
}

#[test]
fn subsequence_match_is_case_insensitive() {
    assert!(is_subsequence_match("mfc", "MyFileController.rs"));
    assert!(is_subsequence_match("", "anything"));
    assert!(!is_subsequence_match("zzz", "readme.md"));
}

#[test]
fn clean_pattern_drops_spaces_and_stars() {
    assert_eq!(clean_pattern("my *file ctrl"), "myfilectrl");
}

#[test]
fn search_respects_limit_and_iteration_order() {
    let snap = snapshot(vec![
        ("main.rs", "src/main.rs", false),
        ("lib.rs", "src/lib.rs", false),
        ("mod.rs", "src/pty/mod.rs", false),
    ]);
    let (results, _opened) = search(&snap, "m", &[], 2);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].short, "main.rs");
    assert_eq!(results[1].short, "lib.rs");
}

#[test]
fn opened_results_preserve_input_order_and_filter_by_pattern() {
    let snap = snapshot(vec![
        ("main.rs", "src/main.rs", false),
        ("lib.rs", "src/lib.rs", false),
    ]);
    let opened = vec!["src/lib.rs".to_string(), "src/main.rs".to_string()];
    let (_results, opened_results) = search(&snap, "main", &opened, 10);
    assert_eq!(opened_results.len(), 1);
    assert_eq!(opened_results[0].short, "main.rs");
}

#[test]
fn opened_path_not_in_snapshot_is_silently_skipped() {
    let snap = snapshot(vec![("main.rs", "src/main.rs", false)]);
    let opened = vec!["src/missing.rs".to_string()];
    let (_results, opened_results) = search(&snap, "", &opened, 10);
    assert!(opened_results.is_empty());
}

#[test]
fn opened_absolute_path_under_root_is_normalized_before_matching() {
    let snap = snapshot(vec![("main.rs", "src/main.rs", false)]);
    let opened = vec!["/root/src/main.rs".to_string()];
    let (_results, opened_results) = search(&snap, "", &opened, 10);
    assert_eq!(opened_results.len(), 1);
    assert_eq!(opened_results[0].short, "main.rs");
}

#[test]
fn opened_path_with_leading_dot_slash_is_normalized_before_matching() {
    let snap = snapshot(vec![("main.rs", "src/main.rs", false)]);
    let opened = vec!["./src/main.rs".to_string()];
    let (_results, opened_results) = search(&snap, "", &opened, 10);
    assert_eq!(opened_results.len(), 1);
    assert_eq!(opened_results[0].short, "main.rs");
}
