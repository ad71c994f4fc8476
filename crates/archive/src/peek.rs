//! Peek-then-stream reader.
//!
//! Thin convenience wrapper around standard library I/O primitives
//! ([`Read::take`], [`Cursor`], [`Chain`]) so the archive header can be
//! validated eagerly without losing the bytes for the tar reader.

use std::io::{Chain, Cursor, Read, Result as IoResult};

/// A resumable [`Read`]er: inspect the head of a stream, then hand the
/// whole stream (head included) onward via [`into_reader`](Self::into_reader).
pub struct PeekableReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: Read> PeekableReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buffer: Vec::new() }
    }

    /// Read up to `limit` bytes from the start of the stream.
    ///
    /// Successive calls do not accumulate: a later, larger `limit` only
    /// reads the difference, and a smaller one is served from the buffer.
    /// Returns fewer than `limit` bytes only when the stream ends early.
    pub fn peek(&mut self, limit: usize) -> IoResult<&[u8]> {
        if self.buffer.len() < limit {
            let needed = (limit - self.buffer.len()) as u64;
            (&mut self.inner).take(needed).read_to_end(&mut self.buffer)?;
        }
        Ok(&self.buffer[..self.buffer.len().min(limit)])
    }

    /// Convert into a [`Read`]er that replays the buffered head, then
    /// streams the rest.
    pub fn into_reader(self) -> Chain<Cursor<Vec<u8>>, R> {
        Cursor::new(self.buffer).chain(self.inner)
    }
}
