// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use super::*;

#[test]
fn validates_matching_token() {
    let offered = "auth.bearer.secrettoken";
    assert_eq!(validate_subprotocol(offered, "secrettoken"), Some(offered));
}

#[test]
fn rejects_wrong_token() {
    assert!(validate_subprotocol("auth.bearer.wrong", "secrettoken").is_none());
}

#[test]
fn rejects_missing_subprotocol_prefix() {
    assert!(validate_subprotocol("secrettoken", "secrettoken").is_none());
}

#[test]
fn finds_bearer_entry_among_other_offers() {
    let offered = vec!["chat".to_string(), "auth.bearer.tok".to_string()];
    assert_eq!(find_bearer_subprotocol(&offered), Some("auth.bearer.tok"));
}

#[test]
fn origin_null_is_accepted() {
    assert!(origin_allowed(Some("null"), None));
}

#[test]
fn origin_loopback_is_accepted() {
    assert!(origin_allowed(Some("http://127.0.0.1:5173"), None));
    assert!(origin_allowed(Some("http://localhost:3000"), None));
}

#[test]
fn origin_non_loopback_is_rejected() {
    assert!(!origin_allowed(Some("http://evil.example"), None));
}

#[test]
fn missing_origin_requires_loopback_remote_addr() {
    let loopback: IpAddr = "127.0.0.1".parse().unwrap();
    let remote: IpAddr = "10.0.0.5".parse().unwrap();
    assert!(origin_allowed(None, Some(loopback)));
    assert!(!origin_allowed(None, Some(remote)));
    assert!(!origin_allowed(None, None));
}

#[test]
fn constant_time_eq_matches_and_differs() {
    assert!(constant_time_eq("abc", "abc"));
    assert!(!constant_time_eq("abc", "abd"));
    assert!(!constant_time_eq("abc", "ab"));
}
