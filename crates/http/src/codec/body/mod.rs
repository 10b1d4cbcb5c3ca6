//! Payload framing for request and response bodies.
//!
//! ## Decoders
//! - [`LengthDecoder`]: reads exactly `Content-Length` bytes
//! - [`PayloadDecoder`]: selects between a length-delimited body and no body
//!
//! ## Encoders
//! - [`LengthEncoder`]: writes a body of known length
//! - [`PayloadEncoder`]: selects between known length, no body and close-delimited
//!   passthrough

mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
