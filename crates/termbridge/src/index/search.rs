// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::path::Path;

use super::{Entry, IndexSnapshot};

/// Normalize a client-supplied `opened` path to the root-relative,
/// forward-slash form `Entry::path` is stored in: strip the index root
/// when the path is absolute, strip a leading `./`, and normalize
/// separators.
fn normalize_opened_path(root: &Path, raw: &str) -> String {
    let slash_form = raw.replace('\\', "/");
    let root_form = root.to_string_lossy().replace('\\', "/");
    let relative = slash_form
        .strip_prefix(&root_form)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(&slash_form);
    relative.strip_prefix("./").unwrap_or(relative).to_string()
}

/// Strip whitespace and `*` from a raw search pattern; both are ignored
/// by the matcher rather than treated as glob syntax.
pub fn clean_pattern(pattern: &str) -> String {
    pattern
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '*')
        .collect()
}

/// Case-insensitive subsequence match: every character of `pattern` must
/// appear in `candidate`, in order, though not necessarily contiguous.
/// An empty pattern matches everything.
pub fn is_subsequence_match(pattern: &str, candidate: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    let mut candidate_chars = candidate.chars();
    'pattern: for pc in pattern.chars() {
        let pc = pc.to_ascii_lowercase();
        for cc in candidate_chars.by_ref() {
            if cc.to_ascii_lowercase() == pc {
                continue 'pattern;
            }
        }
        return false;
    }
    true
}

/// Answer a `searchIndex` query: the first `limit` matches in iteration
/// order (not ranked), plus the subset of `opened` (in input order)
/// whose short names also match.
pub fn search(
    snapshot: &IndexSnapshot,
    pattern: &str,
    opened: &[String],
    limit: usize,
) -> (Vec<Entry>, Vec<Entry>) {
    let cleaned = clean_pattern(pattern);

    let results = snapshot
        .entries
        .iter()
        .filter(|entry| is_subsequence_match(&cleaned, &entry.short))
        .take(limit)
        .cloned()
        .collect();

    let opened_results = opened
        .iter()
        .map(|path| normalize_opened_path(&snapshot.root, path))
        .filter_map(|path| snapshot.entries.iter().find(|entry| entry.path == path))
        .filter(|entry| is_subsequence_match(&cleaned, &entry.short))
        .cloned()
        .collect();

    (results, opened_results)
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
