// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::net::IpAddr;

const SUBPROTOCOL_PREFIX: &str = "auth.bearer.";

/// Compare two strings in constant time with respect to content (not
/// length) to avoid leaking the token via timing.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Parse a `Sec-WebSocket-Protocol` offer list and find the bearer-auth
/// entry, if any.
pub fn find_bearer_subprotocol(offered: &[String]) -> Option<&str> {
    offered
        .iter()
        .find(|p| p.starts_with(SUBPROTOCOL_PREFIX))
        .map(String::as_str)
}

/// Validate a `auth.bearer.<token>` subprotocol value against the
/// expected token. Returns the subprotocol to echo back on success.
pub fn validate_subprotocol<'a>(offered: &'a str, expected: &str) -> Option<&'a str> {
    let token = offered.strip_prefix(SUBPROTOCOL_PREFIX)?;
    if constant_time_eq(token, expected) {
        Some(offered)
    } else {
        None
    }
}

/// Origin policy: `null` is accepted (embedded webviews send it), a
/// loopback hostname is accepted, everything else is rejected. A
/// missing Origin header is accepted only when the remote address
/// itself is loopback.
pub fn origin_allowed(origin: Option<&str>, remote: Option<IpAddr>) -> bool {
    match origin {
        Some("null") => true,
        Some(origin) => is_loopback_origin(origin),
        None => remote.is_some_and(|ip| ip.is_loopback()),
    }
}

fn is_loopback_origin(origin: &str) -> bool {
    let host = origin
        .split("://")
        .nth(1)
        .unwrap_or(origin)
        .split(['/', ':'])
        .next()
        .unwrap_or("");
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
