//! A small async web framework on top of `plus-http`.
//!
//! Handlers are registered on a [`Router`] per method and path pattern; the [`Server`]
//! owns the router and answers every request with the first of: a page under the page
//! root, a static route, a matching handler, a server-sent events stream, a GraphQL
//! endpoint, or a 404 page.
//!
//! # Example
//!
//! ```no_run
//! use plus_web::{BoxError, Request, Response, Router, Server, handler_fn};
//!
//! async fn kwtest(request: Request, mut response: Response) -> Result<Response, BoxError> {
//!     let testnum = request.param("testnum").map(ToString::to_string).unwrap_or_default();
//!     response.set_body(format!("<p>testnum=\"{testnum}\"</p>"));
//!     Ok(response)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.get("/kwtest/:testnum", handler_fn(kwtest))?;
//!
//!     let server = Server::builder().router(router).port(8080).debug(true).build()?;
//!     server.start().await;
//!     Ok(())
//! }
//! ```

mod body;
mod date;
mod dispatcher;

pub mod access_log;
pub mod content_type;
pub mod error;
pub mod error_page;
pub mod graphql;
pub mod handler;
pub mod pattern;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod sse;
pub mod static_files;

pub use access_log::{AccessEntry, RequestLogger, TracingLogger};
pub use body::ResponseBody;
pub use error::{BodyDecodeError, BoxError, PatternError, ResponseError, RouteError};
pub use handler::{RequestHandler, StreamHandler, handler_fn, stream_fn};
pub use pattern::{ParamType, ParamValue, PathParams, PathPattern, match_route};
pub use request::Request;
pub use response::Response;
pub use router::{HttpMethod, Router};
pub use server::{Server, ServerBuilder, ServerBuildError};
pub use sse::{Event, EventEmitter, StreamClosed};
