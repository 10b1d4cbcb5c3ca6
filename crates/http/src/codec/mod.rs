//! HTTP codec module for encoding and decoding HTTP messages
//!
//! - [`RequestDecoder`]: decodes request heads and `Content-Length` bodies from the
//!   read half of a connection
//! - [`ResponseEncoder`]: encodes response heads and payloads onto the write half
//!
//! Both are `tokio_util` codecs and are used through `FramedRead`/`FramedWrite` by
//! [`HttpConnection`](crate::connection::HttpConnection).

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use header::DEFAULT_MAX_BODY_SIZE;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
