//! HTTP header encoder implementation for serializing HTTP response headers
//!
//! Writes the status line and header block of a response, and makes the framing headers
//! agree with the [`PayloadSize`] the connection chose for the body.

use crate::protocol::{PayloadSize, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP response headers implementing the [`Encoder`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes the status line and headers into `dst`.
    ///
    /// # Errors
    ///
    /// Returns error if the response version is not HTTP/1.1.
    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut header, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        match header.version() {
            Version::HTTP_11 => {
                write!(
                    FastWrite(dst),
                    "HTTP/1.1 {} {}\r\n",
                    header.status().as_str(),
                    header.status().canonical_reason().unwrap_or("Unknown")
                )?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        let headers = header.headers_mut();
        headers.remove(header::TRANSFER_ENCODING);
        match payload_size {
            PayloadSize::Length(n) => {
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Empty => {
                const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");
                headers.insert(header::CONTENT_LENGTH, ZERO_VALUE);
            }
            PayloadSize::UntilClose => {
                headers.remove(header::CONTENT_LENGTH);
            }
            PayloadSize::HeadOnly(Some(n)) => {
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            // length unknown: keep whatever the handler announced
            PayloadSize::HeadOnly(None) => {}
        }

        for (header_name, header_value) in header.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writer over `BytesMut` used for the formatted status line.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};

    fn encode(head: ResponseHead, payload_size: PayloadSize) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, payload_size), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn status_line_and_length() {
        let head = Response::builder().status(StatusCode::NOT_FOUND).header(header::CONTENT_TYPE, "text/html").body(()).unwrap();
        let encoded = encode(head, PayloadSize::Length(42));

        assert!(encoded.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(encoded.contains("content-type: text/html\r\n"));
        assert!(encoded.contains("content-length: 42\r\n"));
        assert!(encoded.ends_with("\r\n\r\n"));
    }

    #[test]
    fn wrong_content_length_is_corrected() {
        let head = Response::builder().header(header::CONTENT_LENGTH, "999").body(()).unwrap();
        let encoded = encode(head, PayloadSize::Empty);

        assert!(encoded.contains("content-length: 0\r\n"));
        assert!(!encoded.contains("999"));
    }

    #[test]
    fn close_delimited_has_no_length() {
        let head = Response::builder().header(header::CONTENT_TYPE, "text/event-stream").body(()).unwrap();
        let encoded = encode(head, PayloadSize::UntilClose);

        assert_eq!(encoded, "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\r\n");
    }

    #[test]
    fn head_only_keeps_announced_length() {
        let head = Response::builder().header(header::CONTENT_LENGTH, "999").body(()).unwrap();
        assert!(encode(head, PayloadSize::HeadOnly(Some(11))).contains("content-length: 11\r\n"));

        let head = Response::builder().header(header::CONTENT_LENGTH, "999").body(()).unwrap();
        assert!(encode(head, PayloadSize::HeadOnly(None)).contains("content-length: 999\r\n"));
    }

    #[test]
    fn unknown_reason_phrase() {
        let head = Response::builder().status(StatusCode::from_u16(599).unwrap()).body(()).unwrap();
        assert!(encode(head, PayloadSize::Empty).starts_with("HTTP/1.1 599 Unknown\r\n"));
    }

    #[test]
    fn refuse_http2() {
        let head = Response::builder().version(Version::HTTP_2).body(()).unwrap();
        let mut dst = BytesMut::new();
        assert!(HeaderEncoder.encode((head, PayloadSize::Empty), &mut dst).is_err());
    }
}
