//! HTTP response head type.

use http::Response;

/// The head of an HTTP response: status, version and header fields, before the body is
/// attached. The response encoder writes it as the status line plus header block.
pub type ResponseHead = Response<()>;
