//! Multipart reader
use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use http::header::{self, HeaderMap};

use super::header::{extract_headers, PartHeaders};
use super::view::{Bounds, PartView};
use crate::config::MultipartConfig;
use crate::error::MultipartError;
use crate::io::PayloadBuffer;

/// Extract the boundary token from the `Content-Type` header.
pub fn boundary(headers: &HeaderMap) -> Result<String, MultipartError> {
    if let Some(content_type) = headers.get(&header::CONTENT_TYPE) {
        if let Ok(content_type) = content_type.to_str() {
            if let Ok(ct) = content_type.parse::<mime::Mime>() {
                if let Some(boundary) = ct.get_param(mime::BOUNDARY) {
                    Ok(boundary.as_str().to_owned())
                } else {
                    Err(MultipartError::Boundary)
                }
            } else {
                Err(MultipartError::ParseContentType)
            }
        } else {
            Err(MultipartError::ParseContentType)
        }
    } else {
        Err(MultipartError::NoContentType)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// Skipping the preamble
    Preamble,
    /// Positioned right after `--boundary`
    Boundary,
    /// A part has been handed out
    Part,
    /// Closing boundary seen, or no boundary at all
    Eof,
    /// An error was returned
    Failed,
}

/// Streaming `multipart/form-data` reader.
///
/// Parts are produced one at a time by [`next_part`](Multipart::next_part).
/// A [`Part`] borrows the reader, so the previous part is always released
/// before the next one is located; whatever is left of its body is skipped.
///
/// ```rust
/// use std::io::Read;
/// use kayrx_multipart::Multipart;
///
/// # fn main() -> Result<(), kayrx_multipart::MultipartError> {
/// let body: &[u8] = b"--xyz\r\n\
///     Content-Disposition: form-data; name=\"greeting\"\r\n\
///     \r\n\
///     hello\r\n\
///     --xyz--\r\n";
///
/// let mut multipart = Multipart::new(body, "xyz");
/// while let Some(mut part) = multipart.next_part()? {
///     let mut value = String::new();
///     part.read_to_string(&mut value)?;
///     assert_eq!(part.name(), "greeting");
///     assert_eq!(value, "hello");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Multipart<R> {
    payload: PayloadBuffer<R>,
    delimiter: Vec<u8>,
    bounds: Bounds,
    state: State,
    parts: usize,
    config: MultipartConfig,
}

impl<R: Read> Multipart<R> {
    /// Create multipart reader for `reader`, `boundary` comes without the leading `--`.
    pub fn new<B: AsRef<[u8]>>(reader: R, boundary: B) -> Multipart<R> {
        Multipart::with_config(reader, boundary, MultipartConfig::default())
    }

    /// Create multipart reader with custom limits.
    pub fn with_config<B: AsRef<[u8]>>(
        reader: R,
        boundary: B,
        config: MultipartConfig,
    ) -> Multipart<R> {
        let boundary = boundary.as_ref();
        let mut delimiter = Vec::with_capacity(boundary.len() + 3);
        delimiter.extend_from_slice(b"\n--");
        delimiter.extend_from_slice(boundary);

        Multipart {
            payload: PayloadBuffer::with_chunk_size(reader, config.read_buffer_size),
            delimiter,
            bounds: Bounds::default(),
            state: State::Preamble,
            parts: 0,
            config,
        }
    }

    /// Create multipart reader, the boundary is taken from the request headers.
    pub fn from_headers(headers: &HeaderMap, reader: R) -> Result<Multipart<R>, MultipartError> {
        Ok(Multipart::new(reader, boundary(headers)?))
    }

    /// Reader configuration
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Move to the next part.
    ///
    /// Returns `Ok(None)` after the closing boundary, or right away if the
    /// body holds no boundary at all. Input ending before the closing
    /// boundary is reported as [`MultipartError::TruncatedBody`].
    pub fn next_part(&mut self) -> Result<Option<Part<'_, R>>, MultipartError> {
        match self.advance() {
            Ok(true) => (),
            Ok(false) => return Ok(None),
            Err(e) => {
                self.state = State::Failed;
                return Err(e);
            }
        }

        let mut body = PartView::new(&mut self.payload, &self.delimiter, &mut self.bounds);
        let headers = match extract_headers(&mut body, &self.config) {
            Ok(headers) => headers,
            Err(e) => {
                self.state = State::Failed;
                return Err(e);
            }
        };
        debug!(
            "Multipart part #{}: name={:?} filename={:?} content-type={:?}",
            self.parts, headers.name, headers.filename, headers.content_type
        );

        Ok(Some(Part { headers, body }))
    }

    /// Read every remaining part into memory.
    pub fn read_all(mut self) -> Result<Vec<FormPart>, MultipartError> {
        let mut parts = Vec::new();
        while let Some(mut part) = self.next_part()? {
            let data = part.read_to_bytes()?;
            parts.push(FormPart {
                headers: part.headers,
                data,
            });
        }
        Ok(parts)
    }

    /// Returns the wrapped reader. Bytes buffered but not parsed are lost.
    pub fn into_inner(self) -> R {
        self.payload.into_inner()
    }

    /// Walk the state machine until a new part region is open.
    fn advance(&mut self) -> Result<bool, MultipartError> {
        loop {
            match self.state {
                State::Preamble => {
                    if self.seek_first_boundary()? {
                        self.state = State::Boundary;
                    } else {
                        debug!("Multipart body holds no boundary");
                        self.state = State::Eof;
                    }
                }
                State::Part => {
                    self.finish_part()?;
                    self.state = State::Boundary;
                }
                State::Boundary => {
                    if !self.payload.ensure(2)? {
                        return Err(MultipartError::TruncatedBody);
                    }
                    if self.payload.buffered().starts_with(b"--") {
                        debug!("Multipart closing boundary after {} parts", self.parts);
                        self.state = State::Eof;
                        return Ok(false);
                    }
                    if !self.skip_line()? {
                        return Err(MultipartError::TruncatedBody);
                    }
                    if let Some(max) = self.config.max_parts {
                        if self.parts >= max {
                            return Err(MultipartError::TooManyParts(max));
                        }
                    }

                    self.parts += 1;
                    self.bounds = Bounds::open(self.payload.position());
                    self.state = State::Part;
                    return Ok(true);
                }
                State::Eof => return Ok(false),
                State::Failed => return Err(MultipartError::Incomplete),
            }
        }
    }

    /// Find `--boundary` at the start of input or of a line, and move past it.
    fn seek_first_boundary(&mut self) -> Result<bool, MultipartError> {
        let len = self.delimiter.len();

        self.payload.ensure(len - 1)?;
        if self.payload.buffered().starts_with(&self.delimiter[1..]) {
            self.payload.consume(len - 1);
            trace!("Multipart boundary at offset 0");
            return Ok(true);
        }

        loop {
            if let Some(idx) = twoway::find_bytes(self.payload.buffered(), &self.delimiter) {
                self.payload.consume(idx + len);
                trace!("Multipart boundary at offset {}", self.payload.position() - len as u64 + 1);
                return Ok(true);
            }
            let buffered = self.payload.buffered().len();
            if self.payload.is_eof() {
                self.payload.consume(buffered);
                return Ok(false);
            }
            if buffered >= len {
                self.payload.consume(buffered + 1 - len);
            }
            self.payload.fill()?;
        }
    }

    /// Skip what is left of the current part and the delimiter that closes it.
    fn finish_part(&mut self) -> Result<(), MultipartError> {
        let mut body = PartView::new(&mut self.payload, &self.delimiter, &mut self.bounds);
        let skipped = body.skip_to_end()?;
        if skipped > 0 {
            trace!("Multipart skipped {} unread body bytes", skipped);
        }
        if body.is_truncated() {
            return Err(MultipartError::TruncatedBody);
        }

        let len = self.delimiter.len();
        self.payload.ensure(len + 1)?;
        let buf = self.payload.buffered();
        let n = if buf.starts_with(&self.delimiter) {
            len
        } else if buf.starts_with(b"\r") && buf[1..].starts_with(&self.delimiter) {
            len + 1
        } else if buf.starts_with(&self.delimiter[1..]) {
            len - 1
        } else {
            return Err(MultipartError::TruncatedBody);
        };
        self.payload.consume(n);
        Ok(())
    }

    /// Discard the rest of the boundary line, `false` if input ended first.
    fn skip_line(&mut self) -> Result<bool, MultipartError> {
        let limit = self.config.max_line_length;
        let mut skipped = 0;

        loop {
            let buf = self.payload.buffered();
            if let Some(idx) = memchr::memchr(b'\n', buf) {
                self.payload.consume(idx + 1);
                return Ok(true);
            }
            skipped += buf.len();
            let n = buf.len();
            self.payload.consume(n);
            if skipped > limit {
                return Err(MultipartError::LineTooLong(limit));
            }
            if self.payload.fill()? == 0 {
                return Ok(false);
            }
        }
    }
}

impl<R> fmt::Debug for Multipart<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multipart")
            .field("boundary", &String::from_utf8_lossy(&self.delimiter[3..]))
            .field("state", &self.state)
            .field("parts", &self.parts)
            .field("payload", &self.payload)
            .finish()
    }
}

/// One part of a multipart body
///
/// Implements [`Read`] over the part body. The body is only readable while
/// the part is alive; dropping it lets the reader skip ahead.
pub struct Part<'a, R> {
    headers: PartHeaders,
    body: PartView<'a, R>,
}

impl<'a, R: Read> Part<'a, R> {
    /// Field name, empty if the part has no `Content-Disposition`.
    pub fn name(&self) -> &str {
        &self.headers.name
    }

    /// Decoded filename, empty for plain form fields.
    pub fn filename(&self) -> &str {
        &self.headers.filename
    }

    /// Content type, empty if the part has none.
    pub fn content_type(&self) -> &str {
        &self.headers.content_type
    }

    /// All extracted header fields.
    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// `true` if the part carries a filename.
    pub fn is_file(&self) -> bool {
        !self.headers.filename.is_empty()
    }

    /// Content type parsed as a media type.
    pub fn mime(&self) -> Option<mime::Mime> {
        self.headers.content_type.parse().ok()
    }

    /// The bounded view over the part body.
    pub fn body(&mut self) -> &mut PartView<'a, R> {
        &mut self.body
    }

    /// Read the rest of the body into memory.
    pub fn read_to_bytes(&mut self) -> Result<Bytes, MultipartError> {
        let mut data = Vec::new();
        self.body.read_to_end(&mut data)?;
        if self.body.is_truncated() {
            return Err(MultipartError::TruncatedBody);
        }
        Ok(Bytes::from(data))
    }

    /// Read the rest of the body as text, invalid utf-8 is replaced.
    pub fn text(&mut self) -> Result<String, MultipartError> {
        let data = self.read_to_bytes()?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Discard the rest of the body, returns the number of skipped bytes.
    pub fn skip(&mut self) -> Result<u64, MultipartError> {
        let skipped = self.body.skip_to_end()?;
        if self.body.is_truncated() {
            return Err(MultipartError::TruncatedBody);
        }
        Ok(skipped)
    }

    /// Drop the body and keep the header fields.
    pub fn into_headers(self) -> PartHeaders {
        self.headers
    }
}

impl<'a, R: Read> Read for Part<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

impl<'a, R> fmt::Debug for Part<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

/// A part read fully into memory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPart {
    /// Extracted header fields
    pub headers: PartHeaders,
    /// Part body
    pub data: Bytes,
}
