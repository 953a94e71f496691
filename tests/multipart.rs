use std::io::{self, Cursor, Read};

use bytes::Bytes;
use http::header::{self, HeaderMap};
use kayrx_multipart::multipart::boundary;
use kayrx_multipart::{ContentTypeMode, Multipart, MultipartConfig, MultipartError};

#[test]
fn test_boundary() {
    let headers = HeaderMap::new();
    match boundary(&headers) {
        Err(MultipartError::NoContentType) => (),
        _ => unreachable!("should not happen"),
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("test"),
    );

    match boundary(&headers) {
        Err(MultipartError::ParseContentType) => (),
        _ => unreachable!("should not happen"),
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("multipart/mixed"),
    );
    match boundary(&headers) {
        Err(MultipartError::Boundary) => (),
        _ => unreachable!("should not happen"),
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(
            "multipart/mixed; boundary=\"5c02368e880e436dab70ed54e1c58209\"",
        ),
    );

    assert_eq!(
        boundary(&headers).unwrap(),
        "5c02368e880e436dab70ed54e1c58209"
    );
}

// Reader that returns one byte at a time and is interrupted every other call
struct SlowReader {
    bytes: Bytes,
    pos: usize,
    ready: bool,
}

impl SlowReader {
    fn new(bytes: Bytes) -> SlowReader {
        SlowReader {
            bytes,
            pos: 0,
            ready: false,
        }
    }
}

impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.ready {
            self.ready = true;
            return Err(io::ErrorKind::Interrupted.into());
        }
        self.ready = false;
        if self.pos == self.bytes.len() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.bytes[self.pos];
        self.pos += 1;
        Ok(1)
    }
}

// Reader that fails once its data is gone
struct BrokenReader(Cursor<&'static [u8]>);

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            n => Ok(n),
        }
    }
}

const BOUNDARY: &str = "abbc761f78ff4d7cb7573b5a23f96ef0";

fn create_simple_request_with_header() -> (Bytes, HeaderMap) {
    let bytes = Bytes::from(
        "testasdadsad\r\n\
         --abbc761f78ff4d7cb7573b5a23f96ef0\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"fn.txt\"\r\n\
         Content-Type: text/plain; charset=utf-8\r\nContent-Length: 4\r\n\r\n\
         test\r\n\
         --abbc761f78ff4d7cb7573b5a23f96ef0\r\n\
         Content-Type: text/plain; charset=utf-8\r\nContent-Length: 4\r\n\r\n\
         data\r\n\
         --abbc761f78ff4d7cb7573b5a23f96ef0--\r\n",
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(
            "multipart/mixed; boundary=\"abbc761f78ff4d7cb7573b5a23f96ef0\"",
        ),
    );
    (bytes, headers)
}

fn body(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (headers, data) in parts {
        body.extend_from_slice(b"--xyz\r\n");
        body.extend_from_slice(headers.as_bytes());
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"--xyz--\r\n");
    body
}

#[test]
fn test_multipart() {
    let (bytes, headers) = create_simple_request_with_header();

    let mut multipart = Multipart::from_headers(&headers, Cursor::new(bytes)).unwrap();
    match multipart.next_part() {
        Ok(Some(mut field)) => {
            assert_eq!(field.name(), "file");
            assert_eq!(field.filename(), "fn.txt");
            assert!(field.is_file());
            assert_eq!(field.content_type(), "text/plain; charset=utf-8");

            let mime = field.mime().unwrap();
            assert_eq!(mime.type_(), mime::TEXT);
            assert_eq!(mime.subtype(), mime::PLAIN);

            assert_eq!(field.read_to_bytes().unwrap(), "test");
            assert_eq!(field.read_to_bytes().unwrap(), "");
        }
        _ => unreachable!(),
    }

    match multipart.next_part() {
        Ok(Some(mut field)) => {
            assert_eq!(field.name(), "");
            assert_eq!(field.filename(), "");
            assert!(!field.is_file());
            assert_eq!(field.content_type(), "text/plain; charset=utf-8");
            assert_eq!(field.text().unwrap(), "data");
        }
        _ => unreachable!(),
    }

    match multipart.next_part() {
        Ok(None) => (),
        _ => unreachable!(),
    }
    match multipart.next_part() {
        Ok(None) => (),
        _ => unreachable!(),
    }
}

#[test]
fn test_multipart_no_end_crlf() {
    let (mut bytes, _) = create_simple_request_with_header();
    let bytes_stripped = bytes.split_to(bytes.len() - 2); // strip crlf

    let mut multipart = Multipart::new(Cursor::new(bytes_stripped), BOUNDARY);

    match multipart.next_part() {
        Ok(Some(_)) => (),
        _ => unreachable!(),
    }

    match multipart.next_part() {
        Ok(Some(_)) => (),
        _ => unreachable!(),
    }

    match multipart.next_part() {
        Ok(None) => (),
        _ => unreachable!(),
    }
}

#[test]
fn test_stream() {
    let (bytes, _) = create_simple_request_with_header();
    let config = MultipartConfig::default().buffer_size(1);

    let mut multipart = Multipart::with_config(SlowReader::new(bytes), BOUNDARY, config);
    match multipart.next_part() {
        Ok(Some(mut field)) => {
            assert_eq!(field.name(), "file");
            assert_eq!(field.filename(), "fn.txt");
            assert_eq!(field.read_to_bytes().unwrap(), "test");
        }
        _ => unreachable!(),
    }

    match multipart.next_part() {
        Ok(Some(mut field)) => {
            assert_eq!(field.content_type(), "text/plain; charset=utf-8");
            assert_eq!(field.read_to_bytes().unwrap(), "data");
        }
        _ => unreachable!(),
    }

    match multipart.next_part() {
        Ok(None) => (),
        _ => unreachable!(),
    }
}

#[test]
fn test_part_count_and_order() {
    for n in 0..5 {
        let names = (0..n).map(|i| format!("field{}", i)).collect::<Vec<_>>();
        let headers = names
            .iter()
            .map(|name| format!("Content-Disposition: form-data; name=\"{}\"\r\n", name))
            .collect::<Vec<_>>();
        let parts = headers
            .iter()
            .map(|h| (h.as_str(), "value"))
            .collect::<Vec<_>>();

        let read = Multipart::new(Cursor::new(body(&parts)), "xyz")
            .read_all()
            .unwrap();
        assert_eq!(read.len(), n);
        for (part, name) in read.iter().zip(names.iter()) {
            assert_eq!(&part.headers.name, name);
            assert_eq!(part.data, "value");
        }
    }
}

#[test]
fn test_reconstruct_body() {
    let raw = body(&[
        ("Content-Disposition: form-data; name=\"a\"\r\n", "first\r\nwith lines\r\n"),
        ("Content-Disposition: form-data; name=\"b\"\r\nContent-Type: text/plain\r\n", ""),
        ("Content-Disposition: form-data; name=\"c\"; filename=\"c.bin\"\r\n", "--xy\r\n-- xyz"),
    ]);

    for chunk in &[1, 7, 4096] {
        let config = MultipartConfig::default().buffer_size(*chunk);
        let mut multipart = Multipart::with_config(Cursor::new(raw.clone()), "xyz", config);
        let mut rebuilt = Vec::new();
        let mut last = 0;

        while let Some(mut part) = multipart.next_part().unwrap() {
            let data = part.read_to_bytes().unwrap();
            let start = part.body().start() as usize;
            let end = part.body().end().unwrap() as usize;

            assert!(raw[last..start].ends_with(b"\r\n\r\n"));
            assert_eq!(&raw[start..end], &data[..]);

            rebuilt.extend_from_slice(&raw[last..start]);
            rebuilt.extend_from_slice(&data);
            last = end;
        }
        assert!(raw[last..].starts_with(b"\r\n--xyz--"));
        rebuilt.extend_from_slice(&raw[last..]);
        assert_eq!(rebuilt, raw);
    }
}

#[test]
fn test_body_excludes_headers() {
    let raw = body(&[(
        "Content-Disposition: form-data; name=\"upload\"; filename=\"test.png\"\r\nContent-Type: image/png\r\n",
        "\u{89}PNG",
    )]);

    let mut multipart = Multipart::new(Cursor::new(raw), "xyz");
    let mut part = multipart.next_part().unwrap().unwrap();
    assert_eq!(part.name(), "upload");
    assert_eq!(part.filename(), "test.png");
    assert_eq!(part.content_type(), "image/png");
    assert_eq!(part.body().consumed(), 0);

    let mut data = Vec::new();
    part.read_to_end(&mut data).unwrap();
    assert_eq!(data, "\u{89}PNG".as_bytes());
}

#[test]
fn test_extended_filename() {
    let raw = body(&[(
        "Content-Disposition: form-data; name=\"file\"; filename=\"fallback.png\"; filename*=utf-8''na%C3%AFve.png\r\n",
        "x",
    )]);

    let parts = Multipart::new(Cursor::new(raw), "xyz").read_all().unwrap();
    assert_eq!(parts[0].headers.name, "file");
    assert_eq!(parts[0].headers.filename, "naïve.png");
}

#[test]
fn test_missing_disposition() {
    let raw = body(&[("X-Custom: yes\r\nContent-Type:   image/png\r\n", "body")]);

    let parts = Multipart::new(Cursor::new(raw), "xyz").read_all().unwrap();
    assert_eq!(parts[0].headers.name, "");
    assert_eq!(parts[0].headers.filename, "");
    assert_eq!(parts[0].headers.content_type, "image/png");
    assert_eq!(parts[0].data, "body");
}

#[test]
fn test_last_token_content_type() {
    let raw = body(&[("Content-Type: text/plain; charset=utf-8\r\n", "body")]);
    let config = MultipartConfig::default().content_type_mode(ContentTypeMode::LastToken);

    let mut multipart = Multipart::with_config(Cursor::new(raw), "xyz", config);
    let part = multipart.next_part().unwrap().unwrap();
    assert_eq!(part.content_type(), "charset=utf-8");
    assert!(part.mime().is_none());
}

#[test]
fn test_skip_unread_parts() {
    let raw = body(&[
        ("Content-Disposition: form-data; name=\"a\"\r\n", "aaaaaaaaaaaaaaaaaaaaaaaa"),
        ("Content-Disposition: form-data; name=\"b\"\r\n", "bbbb"),
        ("Content-Disposition: form-data; name=\"c\"\r\n", "cc"),
    ]);
    let config = MultipartConfig::default().buffer_size(5);
    let mut multipart = Multipart::with_config(Cursor::new(raw), "xyz", config);

    assert_eq!(multipart.next_part().unwrap().unwrap().name(), "a");
    {
        let mut part = multipart.next_part().unwrap().unwrap();
        assert_eq!(part.name(), "b");
        let mut two = [0u8; 2];
        part.read_exact(&mut two).unwrap();
        assert_eq!(&two, b"bb");
        assert_eq!(part.skip().unwrap(), 2);
    }
    let mut part = multipart.next_part().unwrap().unwrap();
    assert_eq!(part.name(), "c");
    assert_eq!(part.text().unwrap(), "cc");
    drop(part);
    assert!(multipart.next_part().unwrap().is_none());
}

#[test]
fn test_empty_parts() {
    let raw = b"--xyz\r\n\r\n\r\n--xyz\r\n--xyz--".to_vec();

    let parts = Multipart::new(Cursor::new(raw), "xyz").read_all().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].data, "");
    assert_eq!(parts[1].data, "");
    assert_eq!(parts[1].headers.name, "");
}

#[test]
fn test_lf_line_endings() {
    let raw = b"--xyz\n\
                Content-Disposition: form-data; name=\"a\"\n\
                \n\
                one\n\
                --xyz\n\
                Content-Disposition: form-data; name=\"b\"\n\
                \n\
                two\n\
                --xyz--\n"
        .to_vec();

    let parts = Multipart::new(Cursor::new(raw), "xyz").read_all().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].headers.name, "a");
    assert_eq!(parts[0].data, "one");
    assert_eq!(parts[1].headers.name, "b");
    assert_eq!(parts[1].data, "two");
}

#[test]
fn test_no_boundary() {
    let mut multipart = Multipart::new(Cursor::new(Vec::new()), "xyz");
    assert!(multipart.next_part().unwrap().is_none());

    let mut multipart = Multipart::new(Cursor::new(b"just some text\r\n--xy\r\n".to_vec()), "xyz");
    assert!(multipart.next_part().unwrap().is_none());
    assert!(multipart.next_part().unwrap().is_none());
}

#[test]
fn test_truncated_body() {
    let raw = b"--xyz\r\n\
                Content-Disposition: form-data; name=\"a\"\r\n\
                \r\n\
                complete\r\n\
                --xyz\r\n\
                Content-Disposition: form-data; name=\"b\"\r\n\
                \r\n\
                cut off"
        .to_vec();
    let mut multipart = Multipart::new(Cursor::new(raw.clone()), "xyz");

    assert_eq!(multipart.next_part().unwrap().unwrap().text().unwrap(), "complete");
    {
        let mut part = multipart.next_part().unwrap().unwrap();
        assert_eq!(part.name(), "b");

        let mut data = Vec::new();
        part.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"cut off");
        assert!(part.body().is_truncated());
    }
    match multipart.next_part() {
        Err(MultipartError::TruncatedBody) => (),
        _ => unreachable!(),
    }
    match multipart.next_part() {
        Err(MultipartError::Incomplete) => (),
        _ => unreachable!(),
    }

    match Multipart::new(Cursor::new(raw), "xyz").read_all() {
        Err(MultipartError::TruncatedBody) => (),
        _ => unreachable!(),
    }
}

#[test]
fn test_truncated_in_headers() {
    let raw = b"--xyz\r\nContent-Disposition: form-data; name=\"a\"\r\nContent-Ty".to_vec();
    let mut multipart = Multipart::new(Cursor::new(raw), "xyz");

    {
        let mut part = multipart.next_part().unwrap().unwrap();
        assert_eq!(part.name(), "a");
        match part.read_to_bytes() {
            Err(MultipartError::TruncatedBody) => (),
            _ => unreachable!(),
        }
    }
    match multipart.next_part() {
        Err(MultipartError::TruncatedBody) => (),
        _ => unreachable!(),
    }
}

#[test]
fn test_truncated_after_boundary() {
    for raw in &[&b"--xyz"[..], &b"--xyz\r\nabc\r\n--xyz"[..], &b"--xyz-"[..]] {
        let result = Multipart::new(Cursor::new(raw.to_vec()), "xyz").read_all();
        match result {
            Err(MultipartError::TruncatedBody) => (),
            _ => unreachable!(),
        }
    }
}

#[test]
fn test_part_limit() {
    let raw = body(&[("", "1"), ("", "2"), ("", "3")]);

    let config = MultipartConfig::default().part_limit(3);
    let parts = Multipart::with_config(Cursor::new(raw.clone()), "xyz", config)
        .read_all()
        .unwrap();
    assert_eq!(parts.len(), 3);

    let config = MultipartConfig::default().part_limit(2);
    match Multipart::with_config(Cursor::new(raw), "xyz", config).read_all() {
        Err(MultipartError::TooManyParts(2)) => (),
        _ => unreachable!(),
    }
}

#[test]
fn test_line_limit() {
    let long = format!("Content-Disposition: form-data; name=\"{}\"\r\n", "n".repeat(200));
    let raw = body(&[(long.as_str(), "value")]);

    let config = MultipartConfig::default().line_limit(64);
    let mut multipart = Multipart::with_config(Cursor::new(raw.clone()), "xyz", config);
    match multipart.next_part() {
        Err(MultipartError::LineTooLong(64)) => (),
        _ => unreachable!(),
    }

    let parts = Multipart::new(Cursor::new(raw), "xyz").read_all().unwrap();
    assert_eq!(parts[0].headers.name.len(), 200);
}

#[test]
fn test_header_limit() {
    let mut headers = String::from("Content-Disposition: form-data; name=\"a\"\r\n");
    for _ in 0..100 {
        headers.push_str("X-Filler: y\r\n");
    }
    let raw = body(&[(headers.as_str(), "value")]);

    let config = MultipartConfig::default().header_limit(1024);
    let mut multipart = Multipart::with_config(Cursor::new(raw.clone()), "xyz", config);
    match multipart.next_part() {
        Err(MultipartError::HeadersTooLarge(1024)) => (),
        _ => unreachable!(),
    }

    let config = MultipartConfig::default().header_limit(2048);
    let parts = Multipart::with_config(Cursor::new(raw), "xyz", config)
        .read_all()
        .unwrap();
    assert_eq!(parts[0].headers.name, "a");
    assert_eq!(parts[0].data, "value");
}

#[test]
fn test_many_header_lines() {
    let headers = "X: y\n".repeat(512 * 1024);
    let raw = body(&[(headers.as_str(), "value")]);

    let mut multipart = Multipart::new(Cursor::new(raw), "xyz");
    match multipart.next_part() {
        Err(MultipartError::HeadersTooLarge(16384)) => (),
        _ => unreachable!(),
    }

    let data = "y".repeat(2 * 1024 * 1024);
    let raw = body(&[("Content-Disposition: form-data; name=\"big\"\r\n", data.as_str())]);
    let config = MultipartConfig::default().buffer_size(64 * 1024);
    let parts = Multipart::with_config(Cursor::new(raw), "xyz", config)
        .read_all()
        .unwrap();
    assert_eq!(parts[0].data.len(), data.len());
}

#[test]
fn test_io_error() {
    let reader = BrokenReader(Cursor::new(&b"--xyz\r\n\r\npartial"[..]));
    let mut multipart = Multipart::new(reader, "xyz");

    let mut part = multipart.next_part().unwrap().unwrap();
    match part.read_to_bytes() {
        Err(MultipartError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        _ => unreachable!(),
    }
}

#[test]
fn test_into_inner() {
    let raw = body(&[("", "value")]);
    let len = raw.len() as u64;

    let mut multipart = Multipart::new(Cursor::new(raw), "xyz");
    while multipart.next_part().unwrap().is_some() {}
    assert_eq!(multipart.into_inner().position(), len);
}
