//! Multipart errors
use std::{error, io};

use derive_more::{Display, From};

/// A set of errors that can occur while reading a multipart body
#[derive(Debug, Display, From)]
pub enum MultipartError {
    /// Content-Type header is not found
    #[display(fmt = "No Content-type header found")]
    NoContentType,
    /// Can not parse Content-Type header
    #[display(fmt = "Can not parse Content-Type header")]
    ParseContentType,
    /// Multipart boundary is not found
    #[display(fmt = "Multipart boundary is not found")]
    Boundary,
    /// The body ended before the terminal boundary
    #[display(fmt = "Multipart body ended before the closing boundary")]
    TruncatedBody,
    /// A line exceeded the configured limit
    #[display(fmt = "Line is longer than {} bytes", _0)]
    #[from(ignore)]
    LineTooLong(usize),
    /// The header block of a part exceeded the configured limit
    #[display(fmt = "Part headers are larger than {} bytes", _0)]
    #[from(ignore)]
    HeadersTooLarge(usize),
    /// The body carries more parts than allowed
    #[display(fmt = "Multipart body has more than {} parts", _0)]
    #[from(ignore)]
    TooManyParts(usize),
    /// The reader was used again after it failed
    #[display(fmt = "Multipart stream is incomplete")]
    Incomplete,
    /// Error reading the underlying source
    #[display(fmt = "{}", _0)]
    Io(io::Error),
}

impl error::Error for MultipartError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            MultipartError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MultipartError> for io::Error {
    fn from(err: MultipartError) -> io::Error {
        match err {
            MultipartError::Io(e) => e,
            MultipartError::TruncatedBody => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}
