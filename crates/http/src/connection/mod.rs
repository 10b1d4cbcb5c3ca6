//! HTTP connection handling.
//!
//! [`HttpConnection`] owns the read and write halves of one client connection and runs
//! the request/response loop over it:
//!
//! - decodes request heads and `Content-Length` bodies
//! - answers `Expect: 100-continue`
//! - calls the [`Handler`](crate::handler::Handler) with the complete request
//! - streams the response body back, flushing every frame
//! - keeps the connection open between requests unless the client or a
//!   close-delimited response ends it

mod http_connection;

pub use http_connection::HttpConnection;
