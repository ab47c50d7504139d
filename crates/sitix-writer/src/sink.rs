use crate::Writer;
use std::io::{self, Write as IoWrite};

/// An in-memory sink, used for string-rendering an Evals `SitixVariable`
/// and for the Dereference node's scope-copying string views.
#[derive(Default)]
pub struct StringSink(String);

impl StringSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Writer for StringSink {
    fn write_bytes(&mut self, data: &[u8]) {
        self.0.push_str(&String::from_utf8_lossy(data));
    }
}

/// A 4 KiB buffered sink over any `std::io::Write`, used for output-store
/// file handles. The buffer flushes on overflow and on drop.
pub struct BufferedSink<W: IoWrite> {
    inner: W,
    buf: Vec<u8>,
}

const BUFFER_SIZE: usize = 4096;

impl<W: IoWrite> BufferedSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(BUFFER_SIZE),
        }
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: IoWrite> Writer for BufferedSink<W> {
    fn write_bytes(&mut self, data: &[u8]) {
        if data.len() >= BUFFER_SIZE {
            let _ = self.flush_buf();
            let _ = self.inner.write_all(data);
            return;
        }
        if self.buf.len() + data.len() > BUFFER_SIZE {
            let _ = self.flush_buf();
        }
        self.buf.extend_from_slice(data);
    }
}

impl<W: IoWrite> Drop for BufferedSink<W> {
    fn drop(&mut self) {
        let _ = self.flush_buf();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_sink_accumulates() {
        let mut s = StringSink::new();
        s.write_bytes(b"hello ");
        s.write_str("world");
        assert_eq!(s.into_inner(), "hello world");
    }

    #[test]
    fn buffered_sink_flushes_on_drop() {
        let mut target = Vec::new();
        {
            let mut sink = BufferedSink::new(&mut target);
            sink.write_str("short");
        }
        assert_eq!(target, b"short");
    }

    #[test]
    fn buffered_sink_flushes_on_overflow() {
        let mut target = Vec::new();
        {
            let mut sink = BufferedSink::new(&mut target);
            let chunk = vec![b'x'; BUFFER_SIZE - 1];
            sink.write_bytes(&chunk);
            sink.write_bytes(b"yz");
            assert_eq!(target.len(), BUFFER_SIZE - 1);
        }
        assert_eq!(target.len(), BUFFER_SIZE + 1);
    }
}
