// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use super::*;

fn headers_with_protocol(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("sec-websocket-protocol", value.parse().unwrap());
    headers
}

#[test]
fn offered_protocols_splits_and_trims_comma_list() {
    let headers = headers_with_protocol("chat, auth.bearer.tok , other");
    assert_eq!(
        offered_protocols(&headers),
        vec!["chat".to_string(), "auth.bearer.tok".to_string(), "other".to_string()]
    );
}

#[test]
fn offered_protocols_empty_without_header() {
    assert!(offered_protocols(&HeaderMap::new()).is_empty());
}

#[test]
fn offered_protocols_finds_bearer_entry() {
    let headers = headers_with_protocol("auth.bearer.secrettoken");
    let offered = offered_protocols(&headers);
    assert_eq!(auth::find_bearer_subprotocol(&offered), Some("auth.bearer.secrettoken"));
}
