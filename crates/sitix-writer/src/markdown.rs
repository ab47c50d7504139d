use crate::Writer;

/// The Sitix-Markdown dialect: `**bold**`, `*italic*`, `__underline__`,
/// `~~strike~~`, `` `code` `` (toggle pairs), `{text@href}` links and
/// `{text}` images, space-counted nested lists, and paragraph/blank-line
/// handling. Unlike most Markdown, HTML embedded in the source passes
/// through untouched — there is no escaping of `<`/`>`.
pub struct MarkdownWriter<'a> {
    inner: Box<dyn Writer + 'a>,
    stage: Stage,
    bold: bool,
    italic: bool,
    underline: bool,
    strikethrough: bool,
    code: bool,
    paragraph: bool,
    list: Vec<ListKind>,
    list_pos: i64,
    link_text: String,
    link_href: String,
    lbyte: u8,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Standard,
    LineStart,
    ListPosGrab,
    Star,
    Strike,
    Underl,
    LinkText,
    LinkHref,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

fn close_tag(k: ListKind) -> &'static str {
    match k {
        ListKind::Unordered => "</li></ul>",
        ListKind::Ordered => "</li></ol>",
    }
}

impl<'a> MarkdownWriter<'a> {
    pub fn new(inner: Box<dyn Writer + 'a>) -> Self {
        Self {
            inner,
            stage: Stage::Standard,
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            code: false,
            paragraph: false,
            list: Vec::new(),
            list_pos: -1,
            link_text: String::new(),
            link_href: String::new(),
            lbyte: 0,
        }
    }

    fn unwind_lists(&mut self) {
        while let Some(k) = self.list.pop() {
            self.inner.write_str(close_tag(k));
        }
    }
}

impl<'a> Writer for MarkdownWriter<'a> {
    fn write_bytes(&mut self, data: &[u8]) {
        let mut i: isize = 0;
        let n = data.len() as isize;
        while i < n {
            let byte = data[i as usize];

            if !self.paragraph {
                self.paragraph = true;
                self.inner.write_str("<p>");
            }

            match self.stage {
                Stage::Standard => {
                    if byte == b'\n' {
                        self.stage = Stage::LineStart;
                        if self.lbyte == b' ' {
                            self.inner.write_str("<br/>");
                        }
                    } else if byte == b'`' {
                        self.inner.write_str(if self.code { "</code>" } else { "<code>" });
                        self.code = !self.code;
                    } else if self.code {
                        self.inner.write_bytes(&[byte]);
                    } else if byte == b'{' {
                        self.stage = Stage::LinkText;
                    } else if byte == b'~' {
                        self.stage = Stage::Strike;
                    } else if byte == b'_' {
                        self.stage = Stage::Underl;
                    } else if byte == b'*' {
                        self.stage = Stage::Star;
                    } else {
                        self.inner.write_bytes(&[byte]);
                    }
                    i += 1;
                }
                Stage::LineStart => {
                    if byte == b'\n' {
                        if self.paragraph && self.list.is_empty() {
                            self.inner.write_str("</p>");
                            self.paragraph = false;
                        }
                        self.unwind_lists();
                        i += 1;
                    } else if byte == b' ' {
                        self.list_pos = 1;
                        self.stage = Stage::ListPosGrab;
                        i += 1;
                    } else {
                        self.unwind_lists();
                        self.inner.write_str("\n");
                        self.stage = Stage::Standard;
                        // reprocess this byte in Standard
                    }
                }
                Stage::ListPosGrab => {
                    if byte == b' ' {
                        self.list_pos += 1;
                        i += 1;
                    } else if byte == b'*' || byte == b'-' {
                        let depth = self.list.len() as i64;
                        if self.list_pos > depth {
                            if byte == b'*' {
                                self.list.push(ListKind::Unordered);
                                self.inner.write_str("<ul>");
                            } else {
                                self.list.push(ListKind::Ordered);
                                self.inner.write_str("<ol>");
                            }
                        } else if self.list_pos < depth {
                            while (self.list.len() as i64) > self.list_pos {
                                let k = self.list.pop().unwrap();
                                self.inner.write_str(close_tag(k));
                            }
                        } else if self.list_pos > 0 && !self.list.is_empty() {
                            self.inner.write_str("</li>");
                        }
                        self.stage = Stage::Standard;
                        self.inner.write_str("<li>");
                        i += 1;
                    } else {
                        self.unwind_lists();
                        self.inner.write_bytes(&[byte]);
                        self.stage = Stage::Standard;
                        self.list_pos = -1;
                        i += 1;
                    }
                }
                Stage::Star => {
                    self.stage = Stage::Standard;
                    if byte == b'*' {
                        self.inner.write_str(if self.bold { "</b>" } else { "<b>" });
                        self.bold = !self.bold;
                        i += 1;
                    } else {
                        self.inner.write_str(if self.italic { "</i>" } else { "<i>" });
                        self.italic = !self.italic;
                        // reprocess in Standard
                    }
                }
                Stage::Strike => {
                    self.stage = Stage::Standard;
                    if byte == b'~' {
                        self.inner
                            .write_str(if self.strikethrough { "</s>" } else { "<s>" });
                        self.strikethrough = !self.strikethrough;
                        i += 1;
                    } else {
                        self.inner.write_str("~");
                        // reprocess in Standard
                    }
                }
                Stage::Underl => {
                    self.stage = Stage::Standard;
                    if byte == b'_' {
                        self.inner
                            .write_str(if self.underline { "</u>" } else { "<u>" });
                        self.underline = !self.underline;
                        i += 1;
                    } else {
                        self.inner.write_str("_");
                        // reprocess in Standard
                    }
                }
                Stage::LinkText => {
                    if byte == b'@' {
                        self.stage = Stage::LinkHref;
                    } else if byte == b'}' {
                        self.inner.write_str("<img src=\"");
                        self.inner.write_str(&self.link_text.clone());
                        self.inner.write_str("\"/>");
                        self.stage = Stage::Standard;
                        self.link_text.clear();
                    } else {
                        self.link_text.push(byte as char);
                    }
                    i += 1;
                }
                Stage::LinkHref => {
                    if byte == b'}' {
                        self.stage = Stage::Standard;
                        self.inner.write_str("<a href=\"");
                        self.inner.write_str(&self.link_href.clone());
                        self.inner.write_str("\">");
                        self.inner.write_str(&self.link_text.clone());
                        self.inner.write_str("</a>");
                        self.link_href.clear();
                        self.link_text.clear();
                    } else {
                        self.link_href.push(byte as char);
                    }
                    i += 1;
                }
            }

            self.lbyte = byte;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringSink;

    fn render(chunks: &[&str]) -> String {
        let mut out = StringSink::new();
        {
            let mut w = MarkdownWriter::new(Box::new(&mut out));
            for c in chunks {
                w.write_str(c);
            }
        }
        out.into_inner()
    }

    #[test]
    fn plain_text_gets_wrapped_in_a_paragraph() {
        assert_eq!(render(&["hello"]), "<p>hello");
    }

    #[test]
    fn bold_and_italic_toggle() {
        // the trailing '.' forces the dangling italic-close star to resolve;
        // a lone '*' at the very end of a write is left pending until the
        // next byte arrives, same as the original.
        assert_eq!(
            render(&["**bold** and *italic*."]),
            "<p><b>bold</b> and <i>italic</i>."
        );
    }

    #[test]
    fn underline_and_strike_toggle() {
        assert_eq!(render(&["__u__ ~~s~~"]), "<p><u>u</u> <s>s</s>");
    }

    #[test]
    fn code_suppresses_other_effects() {
        assert_eq!(render(&["`*not bold*`"]), "<p><code>*not bold*</code>");
    }

    #[test]
    fn trailing_space_before_newline_inserts_br() {
        assert_eq!(render(&["line one \nline two"]), "<p>line one <br/>\nline two");
    }

    #[test]
    fn blank_line_closes_paragraph() {
        // the byte right after a blank line reopens a paragraph before the
        // "not actually special" newline gets reprocessed and written, so a
        // fresh <p> precedes the literal \n.
        assert_eq!(render(&["one\n\ntwo"]), "<p>one</p><p>\ntwo");
    }

    #[test]
    fn image_tag() {
        assert_eq!(render(&["{a picture}"]), "<p><img src=\"a picture\"/>");
    }

    #[test]
    fn link_tag() {
        assert_eq!(
            render(&["{click here@https://example.com}"]),
            "<p><a href=\"https://example.com\">click here</a>"
        );
    }

    #[test]
    fn unordered_list_single_level() {
        // the newline that separates two items at the same list depth is
        // consumed by the list state machine, not written literally — a
        // same-depth marker just closes the previous <li> and opens a new one.
        assert_eq!(
            render(&["text\n * one\n * two"]),
            "<p>text<ul><li> one</li><li> two"
        );
    }

    #[test]
    fn nested_list_levels_open_and_close() {
        assert_eq!(
            render(&["\n * a\n  * b\n * c"]),
            "<p><ul><li> a<ul><li> b</li></ul><li> c"
        );
    }

    #[test]
    fn non_list_text_after_leading_spaces_unwinds_lists_and_emits_literally() {
        // a line of leading spaces followed by a non-list, non-space byte
        // unwinds any open list tiers and writes the byte verbatim.
        assert_eq!(render(&["\n * a\n  x"]), "<p><ul><li> a</li></ul>x");
    }

    #[test]
    fn input_split_across_writes_preserves_state() {
        let mut out = StringSink::new();
        {
            let mut w = MarkdownWriter::new(Box::new(&mut out));
            w.write_str("**bo");
            w.write_str("ld**");
        }
        assert_eq!(out.into_inner(), "<p><b>bold</b>");
    }
}
