//! Per-request access logging.
//!
//! Every served request is reported once, after its response has been resolved, to the
//! [`RequestLogger`] installed with [`ServerBuilder::logger`](crate::ServerBuilder::logger).
//! The default, [`TracingLogger`], writes one `info` event per request.

use http::{Method, StatusCode, Uri};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// What is known about a request once it has been answered.
#[derive(Debug, Clone, Copy)]
pub struct AccessEntry<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub peer_addr: Option<SocketAddr>,
    pub status: StatusCode,
    /// Time spent resolving the response; streamed bodies are still being written.
    pub elapsed: Duration,
}

pub trait RequestLogger: Send + Sync {
    fn log(&self, entry: &AccessEntry<'_>);
}

impl<F> RequestLogger for F
where
    F: Fn(&AccessEntry<'_>) + Send + Sync,
{
    fn log(&self, entry: &AccessEntry<'_>) {
        self(entry);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn log(&self, entry: &AccessEntry<'_>) {
        info!(
            method = %entry.method,
            path = %entry.uri.path(),
            peer = ?entry.peer_addr,
            status = entry.status.as_u16(),
            elapsed = ?entry.elapsed,
            "request served"
        );
    }
}
