//! Bounded view over one part of the body.
use std::fmt;
use std::io::{self, Read};

use crate::io::PayloadBuffer;

/// Offsets of the region the current part occupies in the body.
///
/// `origin` is where the region opened, right after a boundary line; a
/// boundary marker found there closes the region without a preceding line
/// break. `searched` counts the leading buffered bytes already scanned
/// without finding a delimiter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Bounds {
    pub(crate) origin: u64,
    pub(crate) start: u64,
    pub(crate) cursor: u64,
    pub(crate) end: Option<u64>,
    pub(crate) truncated: bool,
    pub(crate) searched: usize,
}

impl Bounds {
    pub(crate) fn open(offset: u64) -> Self {
        Bounds {
            origin: offset,
            start: offset,
            cursor: offset,
            end: None,
            truncated: false,
            searched: 0,
        }
    }
}

/// Read-only window over the bytes of one part.
///
/// The window ends right before the line break that precedes the next
/// `--boundary`. The end is not known up front: it is discovered while
/// reading, holding back just enough bytes to recognize a delimiter that
/// straddles two pulls from the reader.
///
/// The view shares the read cursor of its [`PayloadBuffer`], bytes it hands
/// out are gone from the buffer for good.
pub struct PartView<'a, R> {
    payload: &'a mut PayloadBuffer<R>,
    delimiter: &'a [u8],
    bounds: &'a mut Bounds,
}

impl<'a, R: Read> PartView<'a, R> {
    /// `delimiter` is `\n--` followed by the boundary token.
    pub(crate) fn new(
        payload: &'a mut PayloadBuffer<R>,
        delimiter: &'a [u8],
        bounds: &'a mut Bounds,
    ) -> Self {
        debug_assert_eq!(payload.position(), bounds.cursor);
        PartView {
            payload,
            delimiter,
            bounds,
        }
    }

    /// Absolute offset of the first byte this view still exposes.
    pub fn start(&self) -> u64 {
        self.bounds.start
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.bounds.cursor
    }

    /// Absolute offset one past the last byte, once the closing delimiter
    /// or the end of input has been seen.
    pub fn end(&self) -> Option<u64> {
        self.bounds.end
    }

    /// `true` if input ran out before the closing delimiter.
    pub fn is_truncated(&self) -> bool {
        self.bounds.truncated
    }

    /// Number of bytes read since `start`.
    pub fn consumed(&self) -> u64 {
        self.bounds.cursor - self.bounds.start
    }

    /// Forget everything before the cursor: `start` moves to the current
    /// position, later reads only see what follows it.
    pub fn position_start_at_current_location(&mut self) {
        trace!(
            "Multipart view re-anchored from {} to {}",
            self.bounds.start,
            self.bounds.cursor
        );
        self.bounds.start = self.bounds.cursor;
    }

    /// Read next byte, `None` at the end of the view.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.available()? == 0 {
            return Ok(None);
        }
        let byte = self.payload.buffered()[0];
        self.advance(1);
        Ok(Some(byte))
    }

    /// Discard the rest of the view, returns the number of skipped bytes.
    pub fn skip_to_end(&mut self) -> io::Result<u64> {
        let mut skipped = 0;
        loop {
            let n = self.available()?;
            if n == 0 {
                return Ok(skipped);
            }
            self.advance(n);
            skipped += n as u64;
        }
    }

    fn advance(&mut self, n: usize) {
        self.payload.consume(n);
        self.bounds.cursor += n as u64;
        self.bounds.searched = self.bounds.searched.saturating_sub(n);
        debug_assert!(self.bounds.end.map_or(true, |end| self.bounds.cursor <= end));
    }

    /// Number of bytes that can be handed out right now, zero at the end.
    fn available(&mut self) -> io::Result<usize> {
        let delimiter = self.delimiter;
        let marker = &delimiter[1..];

        loop {
            if let Some(end) = self.bounds.end {
                return Ok((end - self.bounds.cursor) as usize);
            }

            if self.bounds.cursor == self.bounds.origin {
                if !self.payload.ensure(marker.len())? {
                    // too short to hold a marker, fall through to eof handling
                } else if self.payload.buffered().starts_with(marker) {
                    trace!("Multipart boundary at offset {}", self.bounds.cursor);
                    self.bounds.end = Some(self.bounds.cursor);
                    continue;
                }
            }

            let buf = self.payload.buffered();
            let from = self.bounds.searched.saturating_sub(delimiter.len());
            if let Some(idx) = twoway::find_bytes(&buf[from..], delimiter) {
                let idx = from + idx;
                let len = if idx > 0 && buf[idx - 1] == b'\r' {
                    idx - 1
                } else {
                    idx
                };
                trace!("Multipart boundary at offset {}", self.bounds.cursor + len as u64);
                self.bounds.end = Some(self.bounds.cursor + len as u64);
                continue;
            }

            if self.payload.is_eof() {
                warn!(
                    "Multipart body ended at offset {} before the closing boundary",
                    self.bounds.cursor + buf.len() as u64
                );
                self.bounds.end = Some(self.bounds.cursor + buf.len() as u64);
                self.bounds.truncated = true;
                continue;
            }
            self.bounds.searched = buf.len();

            // a delimiter may start in the last bytes, together with its `\r`
            let safe = buf.len().saturating_sub(delimiter.len());
            if safe > 0 {
                return Ok(safe);
            }
            self.payload.fill()?;
        }
    }
}

impl<'a, R: Read> Read for PartView<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = std::cmp::min(self.available()?, buf.len());
        buf[..n].copy_from_slice(&self.payload.buffered()[..n]);
        self.advance(n);
        Ok(n)
    }
}

impl<'a, R> fmt::Debug for PartView<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartView")
            .field("start", &self.bounds.start)
            .field("cursor", &self.bounds.cursor)
            .field("end", &self.bounds.end)
            .field("truncated", &self.bounds.truncated)
            .finish()
    }
}
