//! The server: configuration, the accept loop, and the seam to the connection layer.

use crate::access_log::{RequestLogger, TracingLogger};
use crate::body::ResponseBody;
use crate::content_type::{ContentTypeResolver, ExtensionTable};
use crate::dispatcher::Dispatcher;
use crate::error::BoxError;
use crate::error_page::ErrorRenderer;
use crate::router::Router;
use crate::static_files::{FsPageStore, PageStore, StaticFiles};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use plus_http::codec::DEFAULT_MAX_BODY_SIZE;
use plus_http::connection::HttpConnection;
use plus_http::handler::Handler;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_PORT: u16 = 8080;

pub struct ServerBuilder {
    router: Router,
    address: Option<String>,
    port: u16,
    page_root: PathBuf,
    error_root: PathBuf,
    debug: bool,
    max_body_size: u64,
    index_fallback: bool,
    page_store: Arc<dyn PageStore>,
    content_types: Arc<dyn ContentTypeResolver>,
    logger: Arc<dyn RequestLogger>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            router: Router::new(),
            address: None,
            port: DEFAULT_PORT,
            page_root: PathBuf::from("./pages"),
            error_root: PathBuf::from("./errors"),
            debug: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            index_fallback: true,
            page_store: Arc::new(FsPageStore),
            content_types: Arc::new(ExtensionTable::new()),
            logger: Arc::new(TracingLogger),
        }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Host name or IP to listen on. Defaults to `127.0.0.1` in debug mode, `0.0.0.0`
    /// otherwise.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn page_root(mut self, page_root: impl Into<PathBuf>) -> Self {
        self.page_root = page_root.into();
        self
    }

    pub fn error_root(mut self, error_root: impl Into<PathBuf>) -> Self {
        self.error_root = error_root.into();
        self
    }

    /// Shows handler errors on error pages and logs at `debug` level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Whether `GET` requests with no page of their own fall back to `index.<ext>`.
    pub fn index_fallback(mut self, index_fallback: bool) -> Self {
        self.index_fallback = index_fallback;
        self
    }

    pub fn page_store(mut self, page_store: impl PageStore + 'static) -> Self {
        self.page_store = Arc::new(page_store);
        self
    }

    pub fn content_types(mut self, content_types: impl ContentTypeResolver + 'static) -> Self {
        self.content_types = Arc::new(content_types);
        self
    }

    /// Replaces the access log. By default each request is logged as a `tracing` event.
    pub fn logger(mut self, logger: impl RequestLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// # Errors
    ///
    /// Fails when the address can't be resolved.
    pub fn build(self) -> Result<Server, ServerBuildError> {
        let host = self.address.unwrap_or_else(|| if self.debug { "127.0.0.1" } else { "0.0.0.0" }.to_owned());
        let address = (host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| ServerBuildError::InvalidAddress { address: host.clone(), source })?
            .collect::<Vec<_>>();
        if address.is_empty() {
            return Err(ServerBuildError::UnresolvedAddress { address: host });
        }

        let files = StaticFiles::new(self.page_root, self.index_fallback, Arc::clone(&self.page_store), self.content_types);
        let errors = ErrorRenderer::new(self.error_root, self.debug, self.page_store);
        let dispatcher = Dispatcher::new(self.router, files, errors, self.debug, self.logger);

        Ok(Server { dispatcher, address, max_body_size: self.max_body_size, debug: self.debug })
    }
}

pub struct Server {
    dispatcher: Dispatcher,
    address: Vec<SocketAddr>,
    max_body_size: u64,
    debug: bool,
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("invalid address '{address}': {source}")]
    InvalidAddress { address: String, source: io::Error },
    #[error("address '{address}' resolved to nothing")]
    UnresolvedAddress { address: String },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn address(&self) -> &[SocketAddr] {
        &self.address
    }

    /// Installs the log subscriber, binds the configured address and serves until the
    /// process ends.
    pub async fn start(self) {
        init_logging(self.debug);

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        self.serve(tcp_listener).await;
    }

    /// Serves connections accepted from `tcp_listener`, one task per connection.
    pub async fn serve(self, tcp_listener: TcpListener) {
        let max_body_size = self.max_body_size;
        let handler = Arc::new(self);
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer).max_body_size(max_body_size).peer_addr(remote_addr);
                match connection.process(handler).await {
                    Ok(()) => {
                        debug!(peer = %remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        warn!(cause = %e, peer = %remote_addr, "connection closed with error");
                    }
                }
            });
        }
    }
}

/// Installs the fmt subscriber filtered by `RUST_LOG`, or by `debug`/`info` when unset.
/// Returns false when another subscriber was already installed; that one stays in place.
fn init_logging(debug: bool) -> bool {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        Ok(()) => true,
        Err(e) => {
            debug!(cause = %e, "log subscriber already installed, keeping it");
            false
        }
    }
}

#[async_trait]
impl Handler for Server {
    type RespBody = ResponseBody;
    type Error = BoxError;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        Ok(self.dispatcher.dispatch(req).await)
    }
}
