//! Multipart payload support
//!
//! Content-type: multipart/form-data;
mod header;
mod server;
mod view;

pub use self::header::{extract_headers, parse_content_disposition, parse_content_type, PartHeaders};
pub use self::server::{boundary, FormPart, Multipart, Part};
pub use self::view::PartView;
