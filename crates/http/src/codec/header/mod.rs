//! Request header decoding and response header encoding.
//!
//! - [`HeaderDecoder`]: parses the request line and header fields, enforces the header
//!   limits and selects the body framing
//! - [`HeaderEncoder`]: writes the status line and header fields, keeping
//!   `Content-Length` consistent with the payload

mod header_decoder;
mod header_encoder;

pub use header_decoder::DEFAULT_MAX_BODY_SIZE;
pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
