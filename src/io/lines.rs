//! Line reader
use std::io::{self, Read};

use crate::error::MultipartError;

const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// Iterator over the lines of a byte source.
///
/// Lines are terminated by `\n`; a `\r` right before the terminator is
/// dropped. The bytes are decoded as UTF-8, invalid sequences are replaced.
#[derive(Debug)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Lines<R> {
    reader: R,
    limit: usize,
}

impl<R: Read> Lines<R> {
    /// Create new `Lines` instance, lines longer than `limit` bytes are rejected.
    pub fn new(reader: R, limit: usize) -> Self {
        Lines { reader, limit }
    }

    /// Returns the next line in the stream.
    ///
    /// `Ok(None)` means the source was exhausted before any byte was read.
    ///
    /// ```
    /// use kayrx_multipart::io::Lines;
    ///
    /// let mut lines = Lines::new(&b"one\r\n\r\ntwo"[..], 1024);
    /// assert_eq!(lines.next_line().unwrap().as_deref(), Some("one"));
    /// assert_eq!(lines.next_line().unwrap().as_deref(), Some(""));
    /// assert_eq!(lines.next_line().unwrap().as_deref(), Some("two"));
    /// assert_eq!(lines.next_line().unwrap(), None);
    /// ```
    pub fn next_line(&mut self) -> Result<Option<String>, MultipartError> {
        read_line(&mut self.reader, self.limit)
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for Lines<R> {
    type Item = Result<String, MultipartError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Read one line from `reader`, one byte at a time.
///
/// Nothing past the terminating `\n` is consumed, so the reader can be handed
/// on to a body reader right after the blank line that ends a header block.
pub fn read_line<R: Read + ?Sized>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<String>, MultipartError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    let mut terminated = false;

    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == LF {
                    terminated = true;
                    break;
                }
                // one extra byte for a `\r` that may precede the terminator
                if line.len() > limit {
                    return Err(MultipartError::LineTooLong(limit));
                }
                line.push(byte[0]);
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if !terminated && line.is_empty() {
        return Ok(None);
    }
    if terminated && line.last() == Some(&CR) {
        line.pop();
    }
    if line.len() > limit {
        return Err(MultipartError::LineTooLong(limit));
    }

    Ok(Some(match String::from_utf8(line) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }))
}
