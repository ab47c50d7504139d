//! Dotted-name segment splitting shared by `lookup` and `child_search_up`.
//! Ground truth: `original_source/src/types/Object.cpp`'s inline root-segment
//! scan (`for (rootSegLen = 0; ...) if (lname[rootSegLen] == '.' && lname[rootSegLen-1] != '\\') break;`)
//! plus `util.cpp: strip('\\')` to unescape the segment once split off.
//!
//! The original's `child_search_up` builds its per-segment C string without
//! running it through `strip`, which would silently fail to match an escaped
//! dot in a child-search segment against an already-unescaped object name.
//! Both call sites here go through the same unescaping split, which is the
//! behavior `lookup`'s root segment already has and `child_search_up` is
//! presumed to have wanted.

/// Split `name` at the first unescaped `.`, returning the (unescaped) first
/// segment and the remainder (still escaped, consumed by a deeper call).
pub fn split_first_segment(name: &str) -> (String, Option<&str>) {
    let bytes = name.as_bytes();
    let mut split_at = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'.' && (i == 0 || bytes[i - 1] != b'\\') {
            split_at = Some(i);
            break;
        }
        i += 1;
    }
    match split_at {
        Some(idx) => (unescape(&name[..idx]), Some(&name[idx + 1..])),
        None => (unescape(name), None),
    }
}

/// Remove every backslash from `s` (ground truth: `util.cpp: strip`, which
/// drops the escape character outright rather than pairing `\\` -> `\`).
fn unescape(s: &str) -> String {
    s.chars().filter(|&c| c != '\\').collect()
}
