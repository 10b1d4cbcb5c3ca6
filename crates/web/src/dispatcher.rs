//! Turns each request into exactly one response.
//!
//! Resolution order, first hit wins:
//!
//! 1. a page under the page root (`GET` only)
//! 2. a static route registered for exactly this path
//! 3. the first dynamic route of the method whose pattern matches
//! 4. a stream route, when the client accepts `text/event-stream`
//! 5. a GraphQL endpoint registered at exactly this path
//! 6. `404 Not Found`
//!
//! Methods outside the eight standard ones are answered `405` before any of this. Handler
//! errors and panics become `500`; the error text and its source chain are only shown to
//! the client in debug mode, but always logged.

use crate::access_log::{AccessEntry, RequestLogger};
use crate::body::ResponseBody;
use crate::date::DateService;
use crate::error::BoxError;
use crate::error_page::ErrorRenderer;
use crate::request::Request;
use crate::response::{Content, Response};
use crate::router::{HttpMethod, Router};
use crate::sse::{accepts_event_stream, event_channel};
use crate::static_files::StaticFiles;
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderMap, HeaderValue, StatusCode, header};
use once_cell::sync::OnceCell;
use plus_http::protocol::PeerAddr;
use std::any::Any;
use std::error::Error;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

const SERVER: &str = concat!("http+/", env!("CARGO_PKG_VERSION"));
const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS, HEAD, TRACE";

pub(crate) struct Dispatcher {
    router: Router,
    files: StaticFiles,
    errors: ErrorRenderer,
    debug: bool,
    logger: Arc<dyn RequestLogger>,
    date: OnceCell<DateService>,
}

impl Dispatcher {
    pub(crate) fn new(router: Router, files: StaticFiles, errors: ErrorRenderer, debug: bool, logger: Arc<dyn RequestLogger>) -> Self {
        Self { router, files, errors, debug, logger, date: OnceCell::new() }
    }

    pub(crate) async fn dispatch(&self, request: http::Request<Bytes>) -> http::Response<ResponseBody> {
        let started = Instant::now();
        let method = request.method().clone();
        let uri = request.uri().clone();
        let peer_addr = request.extensions().get::<PeerAddr>().map(|peer_addr| peer_addr.0);

        let mut response = self.resolve(Request::from_http(request), uri.path()).await;
        let date = self.date.get_or_init(DateService::new).http_date();
        response.headers_mut().insert(header::DATE, date);
        response.headers_mut().insert(header::SERVER, HeaderValue::from_static(SERVER));

        self.logger.log(&AccessEntry { method: &method, uri: &uri, peer_addr, status: response.status(), elapsed: started.elapsed() });
        response
    }

    async fn resolve(&self, request: Request, path: &str) -> http::Response<ResponseBody> {
        let Ok(method) = HttpMethod::try_from(request.method()) else {
            let mut response = self.render_error(StatusCode::METHOD_NOT_ALLOWED, Some(request.method().as_str()), None).await;
            response.headers_mut().insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
            return response;
        };

        match AssertUnwindSafe(self.route(method, request, path)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(cause = %e, path = %path, "handler failed");
                let traceback = self.debug.then(|| traceback(&*e));
                let message = self.debug.then(|| e.to_string());
                self.render_error(StatusCode::INTERNAL_SERVER_ERROR, message.as_deref(), traceback.as_deref()).await
            }
            Err(panic) => {
                let message = format!("handler panicked: {}", panic_message(panic.as_ref()));
                error!(path = %path, "{message}");
                let message = self.debug.then_some(message);
                self.render_error(StatusCode::INTERNAL_SERVER_ERROR, message.as_deref(), None).await
            }
        }
    }

    async fn route(&self, method: HttpMethod, request: Request, path: &str) -> Result<http::Response<ResponseBody>, BoxError> {
        if method == HttpMethod::Get
            && let Some(page) = self.files.find_page(path).await
        {
            return self.file_response(&page).await;
        }

        if let Some(target) = self.router.static_target(method, path) {
            return match self.files.find_target(target).await {
                Some(file) => self.file_response(&file).await,
                None => Ok(self.not_found(path).await),
            };
        }

        if let Some((handler, params)) = self.router.find(method, path) {
            let response = handler.invoke(request.with_params(params), Response::new()).await?;
            return self.finalize(response, path).await;
        }

        if accepts_event_stream(request.headers())
            && let Some((handler, params)) = self.router.find_stream(path)
        {
            let (emitter, stream) = event_channel();
            let handler = Arc::clone(handler);
            let request = request.with_params(params);
            let stream_path = path.to_owned();

            let producer = tokio::spawn(async move {
                if let Err(e) = handler.stream(request, emitter).await {
                    warn!(cause = %e, path = %stream_path, "stream handler failed");
                }
            });
            return Ok(stream.abort_on_drop(producer).into_response());
        }

        if let Some(endpoint) = self.router.graphql_endpoint(path) {
            let response = endpoint.execute(request, self.debug).await;
            return self.finalize(response, path).await;
        }

        Ok(self.not_found(path).await)
    }

    /// Sends what the handler left in `response`, reading the file it named if any.
    async fn finalize(&self, response: Response, path: &str) -> Result<http::Response<ResponseBody>, BoxError> {
        let (status, mut headers, content, linked) = response.into_parts();
        match content {
            Content::Bytes(body) => Ok(assemble(status, headers, body, linked)),
            Content::File(relative) => match self.files.find_target(&relative).await {
                Some(file) => {
                    let (body, mime) = self.files.load(&file).await?;
                    if !headers.contains_key(header::CONTENT_TYPE)
                        && let Ok(content_type) = HeaderValue::from_str(mime.as_ref())
                    {
                        headers.insert(header::CONTENT_TYPE, content_type);
                    }
                    Ok(assemble(status, headers, body, linked))
                }
                None => Ok(self.not_found(path).await),
            },
        }
    }

    async fn file_response(&self, file: &Path) -> Result<http::Response<ResponseBody>, BoxError> {
        let (body, mime) = self.files.load(file).await?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(mime.as_ref())?);
        Ok(assemble(StatusCode::OK, headers, body, false))
    }

    async fn not_found(&self, path: &str) -> http::Response<ResponseBody> {
        self.render_error(StatusCode::NOT_FOUND, Some(path), None).await
    }

    async fn render_error(&self, status: StatusCode, message: Option<&str>, traceback: Option<&str>) -> http::Response<ResponseBody> {
        let (status, headers, content, linked) = self.errors.render(status, message, traceback).await.into_parts();
        let body = match content {
            Content::Bytes(body) => body,
            Content::File(_) => Bytes::new(),
        };
        assemble(status, headers, body, linked)
    }
}

fn assemble(status: StatusCode, mut headers: HeaderMap, body: Bytes, linked: bool) -> http::Response<ResponseBody> {
    let body = if linked {
        headers.remove(header::CONTENT_LENGTH);
        ResponseBody::empty()
    } else {
        if !body.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        ResponseBody::once(body)
    };

    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// The error followed by its sources, one per line.
fn traceback(error: &(dyn Error + 'static)) -> String {
    let mut lines = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines.join("\n")
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}
