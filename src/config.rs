//! Reader configuration

/// Default upper bound for a single header or boundary line.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// Default upper bound for the header block of a part.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 16 * 1024;

/// Default size of one pull from the underlying reader.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// How the `Content-Type` header of a part is turned into a string.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContentTypeMode {
    /// Keep the whole header value, trimmed.
    ///
    /// `Content-Type: text/plain; charset=utf-8` yields `text/plain; charset=utf-8`.
    HeaderValue,
    /// Take the last whitespace separated token of the header line.
    ///
    /// `Content-Type: text/plain; charset=utf-8` yields `charset=utf-8`.
    LastToken,
}

impl Default for ContentTypeMode {
    fn default() -> Self {
        ContentTypeMode::HeaderValue
    }
}

/// Multipart reader configuration
///
/// ```rust
/// use kayrx_multipart::{ContentTypeMode, MultipartConfig};
///
/// let config = MultipartConfig::default()
///     .line_limit(4096)
///     .header_limit(8192)
///     .part_limit(16)
///     .content_type_mode(ContentTypeMode::LastToken);
/// assert_eq!(config.max_parts(), Some(16));
/// assert_eq!(config.max_header_size(), 8192);
/// ```
#[derive(Clone, Debug)]
pub struct MultipartConfig {
    pub(crate) max_line_length: usize,
    pub(crate) max_header_size: usize,
    pub(crate) max_parts: Option<usize>,
    pub(crate) content_type: ContentTypeMode,
    pub(crate) read_buffer_size: usize,
}

impl MultipartConfig {
    /// Change the maximum length of a header or boundary line. By default 8kB.
    ///
    /// The line break is not counted, a `\r` before the `\n` included.
    pub fn line_limit(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self
    }

    /// Change the maximum size of the header block of a part, line breaks
    /// and the closing blank line included. By default 16kB.
    pub fn header_limit(mut self, limit: usize) -> Self {
        self.max_header_size = limit;
        self
    }

    /// Limit the number of parts the reader produces.
    pub fn part_limit(mut self, limit: usize) -> Self {
        self.max_parts = Some(limit);
        self
    }

    /// Set how part content types are extracted.
    pub fn content_type_mode(mut self, mode: ContentTypeMode) -> Self {
        self.content_type = mode;
        self
    }

    /// Change the size of a single pull from the reader. By default 8kB.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Maximum line length
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Maximum header block size
    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    /// Maximum number of parts, if limited
    pub fn max_parts(&self) -> Option<usize> {
        self.max_parts
    }

    /// Content type extraction mode
    pub fn content_type(&self) -> ContentTypeMode {
        self.content_type
    }

    /// Read buffer size
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }
}

impl Default for MultipartConfig {
    fn default() -> Self {
        MultipartConfig {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_parts: None,
            content_type: ContentTypeMode::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}
