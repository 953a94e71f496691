//! Streaming `multipart/form-data` parser.
//!
//! [`Multipart`] reads a request body from any blocking [`std::io::Read`]
//! and produces its parts one by one. Each [`Part`] carries the field name,
//! the decoded filename and the content type of the part, and reads its own
//! body without the whole request being held in memory.
//!
//! ```rust
//! use kayrx_multipart::Multipart;
//!
//! # fn main() -> Result<(), kayrx_multipart::MultipartError> {
//! let body: &[u8] = b"--boundary\r\n\
//!     Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
//!     Content-Type: text/plain\r\n\
//!     \r\n\
//!     contents\r\n\
//!     --boundary--\r\n";
//!
//! let parts = Multipart::new(body, "boundary").read_all()?;
//! assert_eq!(parts.len(), 1);
//! assert_eq!(parts[0].headers.filename, "a.txt");
//! assert_eq!(parts[0].data, "contents");
//! # Ok(())
//! # }
//! ```
#![allow(clippy::cognitive_complexity)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod io;
pub mod multipart;

pub use crate::config::{ContentTypeMode, MultipartConfig};
pub use crate::error::MultipartError;
pub use crate::multipart::{FormPart, Multipart, Part, PartHeaders, PartView};
