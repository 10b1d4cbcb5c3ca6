//! HTTP request decoder module
//!
//! [`RequestDecoder`] drives header parsing and body framing for a whole connection:
//! a request head, then the body chunks, then exactly one `Eof`, then the next head.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use plus_http::codec::RequestDecoder;
//! use plus_http::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /kwtest/7 HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let message = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert!(message.is_header());
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::header::{DEFAULT_MAX_BODY_SIZE, HeaderDecoder};
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for HTTP requests that handles both headers and payload
///
/// # State Machine
///
/// The decoder keeps its state in the `payload_decoder` field:
/// - `None`: waiting for the next request head
/// - `Some(PayloadDecoder)`: reading the body of the current request
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    /// Creates a decoder with the default body size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder refusing bodies whose `Content-Length` exceeds `max_body_size`.
    pub fn with_max_body_size(max_body_size: u64) -> Self {
        Self { header_decoder: HeaderDecoder::new(max_body_size), payload_decoder: None }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_max_body_size(DEFAULT_MAX_BODY_SIZE)
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // body done, the next bytes start a new request
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}
