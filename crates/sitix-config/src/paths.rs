//! Path rewriting and recursive directory creation.
//!
//! `transmute` rewrites a path rooted under one directory (conventionally
//! the source root) so that it is rooted under another (the output root),
//! the way `sitix -o build` rewrites `posts/one.html` to `build/posts/one.html`.
//! The algorithm is a direct port of the original C++ `transmuted()`: strip a
//! single leading `./`, normalize trailing slashes on both roots, splice.

use std::fs;
use std::io;
use std::path::Path;

/// Rewrite `path` (rooted under `from`) to be rooted under `to` instead.
pub fn transmute(from: &str, to: &str, path: &str) -> String {
    let path = path.strip_prefix("./").unwrap_or(path);
    let from = from.strip_suffix('/').unwrap_or(from);
    let to_trimmed = to.strip_suffix('/').unwrap_or(to);

    let path = if path.as_bytes().get(from.len()) == Some(&b'/') {
        &path[from.len() + 1..]
    } else {
        path.strip_prefix(from).unwrap_or(path)
    };

    let needs_sep = !to_trimmed.is_empty()
        && !to_trimmed.ends_with('/')
        && !path.starts_with('/');

    if needs_sep {
        format!("{to_trimmed}/{path}")
    } else {
        format!("{to_trimmed}{path}")
    }
}

/// Sanely glue two path components together, never doubling or dropping the
/// separating `/`.
pub fn concat(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{}{}", &a[..a.len() - 1], b),
        (true, false) | (false, true) => format!("{a}{b}"),
        (false, false) => format!("{a}/{b}"),
    }
}

/// Create every missing ancestor directory of `path` (which names a file,
/// not a directory — the final segment is never created as a directory).
pub fn mkdir_recursive(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Insert a `\` before every occurrence of `ch` in `s`.
pub fn escape(s: &str, ch: char) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == ch {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmute_basic_example() {
        assert_eq!(transmute("/dev", "/opt", "/dev/null"), "/opt/null");
    }

    #[test]
    fn transmute_relative_roots() {
        assert_eq!(transmute("src", "output", "src/posts/one.html"), "output/posts/one.html");
    }

    #[test]
    fn transmute_strips_leading_dot() {
        assert_eq!(transmute("src", "output", "./src/index.html"), "output/index.html");
    }

    #[test]
    fn transmute_handles_trailing_slash_on_roots() {
        assert_eq!(transmute("src/", "output/", "src/a.html"), "output/a.html");
    }

    #[test]
    fn concat_never_doubles_separator() {
        assert_eq!(concat("output/", "/a.html"), "output/a.html");
        assert_eq!(concat("output", "a.html"), "output/a.html");
        assert_eq!(concat("output/", "a.html"), "output/a.html");
    }

    #[test]
    fn escape_inserts_backslash_before_each_match() {
        assert_eq!(escape("a.b.c", '.'), r"a\.b\.c");
        assert_eq!(escape("no-dots", '.'), "no-dots");
    }
}
