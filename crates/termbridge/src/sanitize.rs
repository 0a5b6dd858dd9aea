// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

/// Strip a truncated OSC 10/11 color-query escape sequence from the start
/// of a replay snapshot.
///
/// A terminal that queries foreground/background color (`ESC ] 10;` or
/// `ESC ] 11;`) expects the reply on stdin, not stdout; if the query
/// itself leaked into the buffer without its leading ESC (because the
/// buffer was trimmed, or the write raced the query), it would otherwise
/// render as visible garbage the first time a client attaches. We only
/// look within the first ~64 bytes after skipping leading CR/LF, and only
/// act on a bare `]` (not itself preceded by ESC) followed by `10;` or
/// `11;`.
pub fn sanitize_snapshot(data: &[u8]) -> Vec<u8> {
    const SCAN_WINDOW: usize = 64;
    const BEL: u8 = 0x07;
    const ESC: u8 = 0x1b;

    let lead_len = data.iter().take_while(|&&b| b == b'\r' || b == b'\n').count();
    let (lead, rest) = data.split_at(lead_len);

    let scan_end = rest.len().min(SCAN_WINDOW);
    let window = &rest[..scan_end];

    for i in 0..window.len() {
        if window[i] != b']' {
            continue;
        }
        if i > 0 && window[i - 1] == ESC {
            continue;
        }
        let after = &window[i + 1..];
        let is_osc_10_or_11 = after.starts_with(b"10;") || after.starts_with(b"11;");
        if !is_osc_10_or_11 {
            continue;
        }

        // Find the terminator: BEL, or ESC followed by '\\' (ST).
        let mut end = None;
        let mut j = i + 1;
        while j < rest.len() {
            if rest[j] == BEL {
                end = Some(j + 1);
                break;
            }
            if rest[j] == ESC && rest.get(j + 1) == Some(&b'\\') {
                end = Some(j + 2);
                break;
            }
            j += 1;
        }

        let cut_end = end.unwrap_or(rest.len());
        let mut out = Vec::with_capacity(lead.len() + rest.len() - (cut_end - i));
        out.extend_from_slice(lead);
        out.extend_from_slice(&rest[..i]);
        out.extend_from_slice(&rest[cut_end..]);
        return out;
    }

    data.to_vec()
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
