// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use super::Entry;

#[derive(Debug, Clone)]
struct GitignoreRule {
    regex: Regex,
    dir_only: bool,
    negate: bool,
}

#[derive(Debug, Clone, Default)]
struct GitignoreSet {
    rules: Vec<GitignoreRule>,
}

impl GitignoreSet {
    fn load(dir: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(dir.join(".gitignore")) else {
            return Self::default();
        };
        let rules = contents.lines().filter_map(compile_rule).collect();
        Self { rules }
    }

    fn is_ignored(&self, relative: &str, is_dir: bool) -> bool {
        let mut ignored = false;
        for rule in &self.rules {
            if rule.dir_only && !is_dir {
                continue;
            }
            if rule.regex.is_match(relative) {
                ignored = !rule.negate;
            }
        }
        ignored
    }
}

fn compile_rule(line: &str) -> Option<GitignoreRule> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let negate = line.starts_with('!');
    let body = if negate { &line[1..] } else { line };
    let dir_only = body.ends_with('/');
    let body = body.strip_suffix('/').unwrap_or(body);
    let anchored = body.starts_with('/');
    let body = body.trim_start_matches('/');

    let regex = Regex::new(&glob_to_regex(body, anchored)).ok()?;
    Some(GitignoreRule {
        regex,
        dir_only,
        negate,
    })
}

/// Translate one gitignore glob line into an anchored regex matched
/// against a path relative to the `.gitignore`'s own directory.
fn glob_to_regex(pattern: &str, anchored: bool) -> String {
    let mut out = String::from("^");
    if !anchored {
        out.push_str("(?:.*/)?");
    }

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    out
}

/// Recursively walk `root`, honoring `.gitignore` at each directory
/// level. Ignored directories are never descended into.
pub fn scan(root: &Path) -> anyhow::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut stack: Vec<(PathBuf, GitignoreSet)> =
        vec![(root.to_path_buf(), GitignoreSet::load(root))];

    let mut it = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(item) = it.next() {
        let item = match item {
            Ok(item) => item,
            Err(_) => continue,
        };
        let path = item.path();
        let depth = item.depth();
        stack.truncate(depth);

        let is_dir = item.file_type().is_dir();

        if path.file_name().is_some_and(|n| n == ".git") {
            if is_dir {
                it.skip_current_dir();
            }
            continue;
        }

        let ignored = stack.iter().any(|(dir, set)| {
            path.strip_prefix(dir)
                .map(|rel| set.is_ignored(&rel.to_string_lossy(), is_dir))
                .unwrap_or(false)
        });

        if ignored {
            if is_dir {
                it.skip_current_dir();
            }
            continue;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        let short = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        entries.push(Entry {
            short,
            path: rel.to_string_lossy().replace('\\', "/"),
            is_dir,
        });

        if is_dir {
            stack.push((path.to_path_buf(), GitignoreSet::load(path)));
        }
    }

    Ok(entries)
}

#[cfg(test)]
#[path = "ignore_tests.rs"]
mod tests;
