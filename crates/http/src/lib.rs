//! The HTTP/1.1 connection layer of http-plus
//!
//! This crate turns a byte stream into a sequence of complete requests and writes the
//! handler's responses back. It is deliberately small: request bodies are framed by
//! `Content-Length` only and are collected before the handler runs, while response
//! bodies are streamed frame by frame so that long-lived responses (server-sent events)
//! can push data as it is produced.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 request parsing with `httparse`
//! - `Content-Length` request bodies with a configurable size limit
//! - Keep-alive connections and pipelined requests
//! - Expect-continue mechanism
//! - Close-delimited responses for bodies of unknown length
//! - Remote address exposed as a request extension
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use plus_http::connection::HttpConnection;
//! use plus_http::handler::{BoxError, make_handler};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer).peer_addr(remote_addr);
//!             if let Err(e) = connection.process(handler).await {
//!                 error!(cause = %e, "connection shutdown with error");
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<Bytes>) -> Result<Response<Full<Bytes>>, BoxError> {
//!     info!(path = request.uri().path(), body_size = request.body().len(), "receive request");
//!     Ok(Response::new(Full::new(Bytes::from_static(b"Hello World!\r\n"))))
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: the per-connection request/response loop
//! - [`protocol`]: message, header and error types
//! - [`codec`]: request decoding and response encoding
//! - [`handler`]: the trait the application implements
//!
//! # Limitations
//!
//! - HTTP/1.x only, no TLS
//! - No chunked transfer coding (requests using it are answered with 501)
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64
//!
//! # Safety
//!
//! Header values are built without re-validation from bytes `httparse` already
//! checked; that is the only unsafe code in the crate.

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
