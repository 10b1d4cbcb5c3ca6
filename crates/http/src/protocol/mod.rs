//! Core HTTP protocol types shared by the codecs and the connection driver.
//!
//! - **Message handling** ([`Message`], [`PayloadItem`], [`PayloadSize`]): the frames the
//!   codecs exchange with the connection.
//! - **Request processing** ([`RequestHeader`]): the decoded request head.
//! - **Response processing** ([`ResponseHead`]): the response head handed to the encoder.
//! - **Errors** ([`HttpError`], [`ParseError`], [`SendError`]).
//! - **Connection metadata** ([`PeerAddr`]): the remote address, stored in request
//!   extensions.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

/// The remote address of the connection a request arrived on.
///
/// Inserted into the request extensions by [`HttpConnection`](crate::connection::HttpConnection)
/// when the address is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub std::net::SocketAddr);
