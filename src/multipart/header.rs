//! Part header extraction.
//!
//! Only `Content-Disposition` and `Content-Type` are understood. Malformed or
//! unknown header lines never fail a part, the affected fields stay empty.
use std::io::Read;

use encoding_rs::UTF_8;
use percent_encoding::percent_decode_str;

use super::view::PartView;
use crate::config::{ContentTypeMode, MultipartConfig};
use crate::error::MultipartError;
use crate::io::read_line;

const CONTENT_DISPOSITION: &str = "content-disposition";
const CONTENT_TYPE: &str = "content-type";

/// Fields extracted from the header block of a part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartHeaders {
    /// `name` parameter of `Content-Disposition`, empty if absent.
    pub name: String,
    /// Decoded filename, empty if absent. `filename*` wins over `filename`.
    pub filename: String,
    /// Content type, empty if absent.
    pub content_type: String,
}

impl PartHeaders {
    /// Feed one header line.
    pub fn apply_line(&mut self, line: &str, mode: ContentTypeMode) {
        let (name, value) = match split_header(line) {
            Some(header) => header,
            None => return,
        };

        if name.eq_ignore_ascii_case(CONTENT_DISPOSITION) {
            let disposition = parse_content_disposition(value);
            self.name = disposition.0;
            self.filename = disposition.1;
        } else if name.eq_ignore_ascii_case(CONTENT_TYPE) {
            self.content_type = parse_content_type(line, mode);
        }
    }
}

/// Read header lines from `view` up to the blank separator line, then
/// re-anchor the view so that it only exposes the part body.
///
/// Running out of input inside the header block ends the scan early, the
/// fields parsed so far are kept. A header block larger than the configured
/// limit fails with [`MultipartError::HeadersTooLarge`].
pub fn extract_headers<R: Read>(
    view: &mut PartView<'_, R>,
    config: &MultipartConfig,
) -> Result<PartHeaders, MultipartError> {
    let mut headers = PartHeaders::default();

    while let Some(line) = read_line(view, config.max_line_length)? {
        if view.consumed() > config.max_header_size as u64 {
            return Err(MultipartError::HeadersTooLarge(config.max_header_size));
        }
        if line.is_empty() {
            break;
        }
        headers.apply_line(&line, config.content_type);
    }
    view.position_start_at_current_location();

    Ok(headers)
}

fn split_header(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(':')?;
    Some((line[..idx].trim(), line[idx + 1..].trim()))
}

/// Extract `(name, filename)` from a `Content-Disposition` value.
///
/// ```rust
/// use kayrx_multipart::multipart::parse_content_disposition;
///
/// let (name, filename) = parse_content_disposition(
///     "form-data; name=\"file\"; filename=\"fallback.png\"; filename*=utf-8''na%C3%AFve.png",
/// );
/// assert_eq!(name, "file");
/// assert_eq!(filename, "naïve.png");
/// ```
pub fn parse_content_disposition(value: &str) -> (String, String) {
    let mut name = None;
    let mut filename = None;
    let mut extended = None;

    for (key, value) in parameters(value) {
        if key.eq_ignore_ascii_case("name") {
            name.get_or_insert(value);
        } else if key.eq_ignore_ascii_case("filename") {
            filename.get_or_insert(value);
        } else if key.eq_ignore_ascii_case("filename*") && extended.is_none() {
            extended = decode_ext_value(&value);
        }
    }

    let filename = match extended {
        Some(extended) if !extended.is_empty() => extended,
        _ => filename.unwrap_or_default(),
    };
    (name.unwrap_or_default(), filename)
}

/// Extract the content type from a whole `Content-Type` header line.
pub fn parse_content_type(line: &str, mode: ContentTypeMode) -> String {
    match mode {
        ContentTypeMode::HeaderValue => split_header(line)
            .map(|(_, value)| value.to_owned())
            .unwrap_or_default(),
        ContentTypeMode::LastToken => line
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .trim()
            .to_owned(),
    }
}

/// Decode an extended parameter value, `charset'language'percent-encoded`.
///
/// Only `utf-8` and `iso-8859-1` are recognised.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;
    if encoded.is_empty() {
        return None;
    }

    let bytes = percent_decode_str(encoded).collect::<Vec<u8>>();
    if charset.eq_ignore_ascii_case("utf-8") {
        match UTF_8.decode_without_bom_handling_and_without_replacement(&bytes) {
            Some(decoded) => Some(decoded.into_owned()),
            None => {
                warn!("Malformed utf-8 in extended filename: {:?}", encoded);
                None
            }
        }
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(encoding_rs::mem::decode_latin1(&bytes).into_owned())
    } else {
        warn!("Unsupported charset in extended filename: {:?}", charset);
        None
    }
}

/// Split `key=value` pairs separated by `;`. Values may be quoted, inside
/// quotes `\"` stands for a literal quote. Items without `=` are skipped.
fn parameters(mut rest: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c == ';' || c.is_whitespace());
        if rest.is_empty() {
            return params;
        }

        let key_end = rest.find(|c: char| c == '=' || c == ';').unwrap_or_else(|| rest.len());
        let key = rest[..key_end].trim();
        rest = &rest[key_end..];
        if !rest.starts_with('=') {
            continue;
        }
        rest = rest[1..].trim_start();

        let value = if rest.starts_with('"') {
            let (value, tail) = unquote(&rest[1..]);
            rest = tail;
            value
        } else {
            let end = rest.find(';').unwrap_or_else(|| rest.len());
            let value = rest[..end].trim().to_owned();
            rest = &rest[end..];
            value
        };
        params.push((key.to_owned(), value));
    }
}

fn unquote(s: &str) -> (String, &str) {
    let mut value = String::new();
    let mut chars = s.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return (value, &s[idx + 1..]),
            '\\' if chars.peek().map(|&(_, c)| c) == Some('"') => {
                value.push('"');
                chars.next();
            }
            c => value.push(c),
        }
    }
    // unterminated quote, keep what is there
    (value, "")
}
