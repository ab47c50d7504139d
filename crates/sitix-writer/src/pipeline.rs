use crate::Writer;

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Collapses every run of ASCII whitespace — leading, internal, or trailing —
/// to exactly one space, except a *leading* run, which is suppressed
/// entirely (spec §4.2; ground truth `sitixwriter.cpp`'s `minifyState`,
/// which starts `false` so the first run writes nothing). State (`in_ws`)
/// is carried across `write_bytes` calls so a run split across two writes
/// still collapses correctly; starting it `true` makes the writer's very
/// first byte look like "already inside a whitespace run", which is what
/// swallows a leading run instead of emitting one space for it.
pub struct MinifyWriter<'a> {
    inner: Box<dyn Writer + 'a>,
    in_ws: bool,
}

impl<'a> MinifyWriter<'a> {
    pub fn new(inner: Box<dyn Writer + 'a>) -> Self {
        Self {
            inner,
            in_ws: true,
        }
    }
}

impl<'a> Writer for MinifyWriter<'a> {
    fn write_bytes(&mut self, data: &[u8]) {
        let n = data.len();
        let mut i = 0;
        while i < n {
            if is_whitespace(data[i]) {
                if !self.in_ws {
                    self.inner.write_bytes(b" ");
                    self.in_ws = true;
                }
                i += 1;
            } else {
                self.in_ws = false;
                let start = i;
                while i < n && !is_whitespace(data[i]) {
                    i += 1;
                }
                self.inner.write_bytes(&data[start..i]);
            }
        }
    }
}

/// Drops every `\` and passes the following byte through literally. Carries
/// a pending-escape flag across calls so a trailing `\` at a buffer boundary
/// still escapes the first byte of the next write.
pub struct EscapeStripWriter<'a> {
    inner: Box<dyn Writer + 'a>,
    pending_escape: bool,
}

impl<'a> EscapeStripWriter<'a> {
    pub fn new(inner: Box<dyn Writer + 'a>) -> Self {
        Self {
            inner,
            pending_escape: false,
        }
    }
}

impl<'a> Writer for EscapeStripWriter<'a> {
    fn write_bytes(&mut self, data: &[u8]) {
        let n = data.len();
        let mut i = 0;
        while i < n {
            if self.pending_escape {
                self.inner.write_bytes(&data[i..i + 1]);
                self.pending_escape = false;
                i += 1;
                continue;
            }
            let start = i;
            while i < n && data[i] != b'\\' {
                i += 1;
            }
            if i > start {
                self.inner.write_bytes(&data[start..i]);
            }
            if i < n {
                // data[i] == '\\'
                i += 1;
                if i < n {
                    self.inner.write_bytes(&data[i..i + 1]);
                    i += 1;
                } else {
                    self.pending_escape = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringSink;

    fn minify(chunks: &[&str]) -> String {
        let mut out = StringSink::new();
        {
            let mut w = MinifyWriter::new(Box::new(&mut out));
            for c in chunks {
                w.write_str(c);
            }
        }
        out.into_inner()
    }

    fn strip(chunks: &[&str]) -> String {
        let mut out = StringSink::new();
        {
            let mut w = EscapeStripWriter::new(Box::new(&mut out));
            for c in chunks {
                w.write_str(c);
            }
        }
        out.into_inner()
    }

    #[test]
    fn minify_collapses_every_run_to_one_space_and_drops_the_leading_run() {
        assert_eq!(minify(&["  hello   world  "]), "hello world ");
    }

    #[test]
    fn minify_run_split_across_writes_still_collapses() {
        assert_eq!(minify(&["a  ", "  b"]), "a b");
    }

    #[test]
    fn strip_drops_backslash_and_keeps_next_byte() {
        assert_eq!(strip(&[r"\[=test Test]\[^test]"]), "[=test Test][^test]");
    }

    #[test]
    fn strip_handles_backslash_at_buffer_boundary() {
        assert_eq!(strip(&["a\\", "\\b"]), "a\\b");
    }

    #[test]
    fn strip_double_backslash_escapes_backslash() {
        assert_eq!(strip(&[r"a\\b"]), r"a\b");
    }
}
