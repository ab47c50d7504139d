//! The render writer pipeline: a small chain of decorators built fresh per
//! render from the current [`Fileflags`], in precedence order
//! markdown > minify > escape-strip > raw, matching the original
//! `SitixWriter::write` dispatch (`sitixwriter.cpp`) but expressed as an
//! explicit decorator stack instead of a flag-toggle-and-recurse trick.

mod markdown;
mod pipeline;
mod sink;

pub use markdown::MarkdownWriter;
pub use pipeline::{EscapeStripWriter, MinifyWriter};
pub use sink::{BufferedSink, StringSink};

use sitix_config::Fileflags;

/// Anything that accepts rendered bytes. `write_str` is a convenience over
/// `write_bytes` for the common UTF-8 case.
pub trait Writer {
    fn write_bytes(&mut self, data: &[u8]);

    fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write_bytes(&mut self, data: &[u8]) {
        (**self).write_bytes(data);
    }
}

/// Build the writer stack implied by `flags`, wrapping `sink`. If no flag is
/// active the bytes pass through `sink` unchanged.
pub fn build_pipeline<'a>(flags: Fileflags, sink: Box<dyn Writer + 'a>) -> Box<dyn Writer + 'a> {
    let mut w = sink;
    if flags.sitix {
        w = Box::new(EscapeStripWriter::new(w));
    }
    if flags.minify {
        w = Box::new(MinifyWriter::new(w));
    }
    if flags.markdown {
        w = Box::new(MarkdownWriter::new(w));
    }
    w
}
