//! Buffered access to the request body.
//!
//! [`PayloadBuffer`] wraps any [`Read`] and keeps the bytes that were pulled
//! but not yet consumed, together with the absolute offset of the first
//! buffered byte. Every view over the body reads through the same buffer, so
//! the offset doubles as the shared read cursor.
use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, Bytes, BytesMut};

use crate::config::DEFAULT_READ_BUFFER_SIZE;

pub mod lines;

pub use self::lines::{read_line, Lines};

/// Pull buffer over a blocking reader
pub struct PayloadBuffer<R> {
    reader: R,
    buf: BytesMut,
    offset: u64,
    chunk: usize,
    eof: bool,
}

impl<R> PayloadBuffer<R> {
    /// Absolute offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Bytes pulled from the reader but not consumed yet.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// `true` once the reader reported end of input.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Drop `n` buffered bytes and move the cursor past them.
    ///
    /// Panics if fewer than `n` bytes are buffered.
    pub(crate) fn consume(&mut self, n: usize) {
        self.buf.advance(n);
        self.offset += n as u64;
    }

    /// Returns the wrapped reader, discarding the buffered bytes.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> PayloadBuffer<R> {
    /// Create new `PayloadBuffer` instance
    pub fn new(reader: R) -> Self {
        PayloadBuffer::with_chunk_size(reader, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Create new `PayloadBuffer` that pulls at most `chunk` bytes per read.
    pub fn with_chunk_size(reader: R, chunk: usize) -> Self {
        PayloadBuffer {
            reader,
            buf: BytesMut::new(),
            offset: 0,
            chunk: chunk.max(1),
            eof: false,
        }
    }

    /// Pull one chunk from the reader.
    ///
    /// Returns the number of bytes added; zero means the reader is exhausted.
    pub(crate) fn fill(&mut self) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }

        let len = self.buf.len();
        self.buf.resize(len + self.chunk, 0);
        loop {
            match self.reader.read(&mut self.buf[len..]) {
                Ok(n) => {
                    self.buf.truncate(len + n);
                    if n == 0 {
                        self.eof = true;
                    }
                    return Ok(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(len);
                    return Err(e);
                }
            }
        }
    }

    /// Pull until at least `size` bytes are buffered or the reader is exhausted.
    pub(crate) fn ensure(&mut self, size: usize) -> io::Result<bool> {
        while self.buf.len() < size {
            if self.fill()? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Read next byte
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.ensure(1)? {
            return Ok(None);
        }
        let byte = self.buf[0];
        self.consume(1);
        Ok(Some(byte))
    }

    /// Read up to `size` bytes, pulling once if nothing is buffered.
    pub fn read_max(&mut self, size: usize) -> io::Result<Option<Bytes>> {
        if !self.ensure(1)? {
            return Ok(None);
        }
        let size = std::cmp::min(self.buf.len(), size);
        self.offset += size as u64;
        Ok(Some(self.buf.split_to(size).freeze()))
    }
}

impl<R> fmt::Debug for PayloadBuffer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadBuffer")
            .field("offset", &self.offset)
            .field("buffered", &self.buf.len())
            .field("eof", &self.eof)
            .finish()
    }
}
