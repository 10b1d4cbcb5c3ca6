//! Error pages.
//!
//! A page at `<error root>/<code>/.html` is sent verbatim. Without one, a small HTML page
//! is put together from the status code, its reason phrase and a short description.

use crate::response::{Payload, Response};
use crate::static_files::PageStore;
use http::{HeaderValue, StatusCode, header};
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct ErrorRenderer {
    root: PathBuf,
    debug: bool,
    store: Arc<dyn PageStore>,
}

impl std::fmt::Debug for ErrorRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorRenderer").field("root", &self.root).field("debug", &self.debug).finish_non_exhaustive()
    }
}

impl ErrorRenderer {
    pub fn new(root: impl Into<PathBuf>, debug: bool, store: Arc<dyn PageStore>) -> Self {
        Self { root: root.into(), debug, store }
    }

    /// The error response for `status`. `traceback` is shown in debug mode only.
    pub async fn render(&self, status: StatusCode, message: Option<&str>, traceback: Option<&str>) -> Response {
        let custom = self.root.join(status.as_str()).join(".html");
        let body = if self.store.is_file(&custom).await {
            match self.store.read(&custom).await {
                Ok(page) => Some(page),
                Err(e) => {
                    warn!(cause = %e, page = %custom.display(), "can't read error page");
                    None
                }
            }
        } else {
            None
        };

        let body = match body {
            Some(page) => page.into(),
            None => synthesize(status, message, traceback.filter(|_| self.debug)),
        };

        let mut response = Response::new();
        response.set_status(status).set_body(body);
        response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        response
    }
}

fn synthesize(status: StatusCode, message: Option<&str>, traceback: Option<&str>) -> Payload {
    let code = status.as_u16();
    let title = status.canonical_reason().unwrap_or("Unknown Error");

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n    <title>{code} {title}</title>\n</head>\n<body>\n    <h1>{code} {title}</h1>\n    <p>{}</p>\n",
        description(status)
    );
    if let Some(message) = message {
        let _ = writeln!(html, "    <p>{}</p>", escape_html(message));
    }
    if let Some(traceback) = traceback {
        let _ = writeln!(html, "    <pre>{}</pre>", escape_html(traceback));
    }
    let _ = write!(
        html,
        "    <img src=\"https://http.cat/{code}.jpg\" alt=\"{title}\" />\n    <h3>Read more about the error <a href=\"https://developer.mozilla.org/en-US/docs/Web/HTTP/Status/{code}\">here</a>.</h3>\n</body>\n</html>\n"
    );
    html.into()
}

fn description(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "The request could not be understood by the server.",
        401 => "You are not authorized to access this page.",
        403 => "You are forbidden from accessing this page.",
        404 => "The page you were looking for could not be found.",
        405 => "The method you requested is not allowed for this page.",
        406 => "The server cannot produce a response acceptable to the client.",
        408 => "The server did not receive the complete request in time.",
        409 => "Your request conflicts with the current state of the server.",
        410 => "The page you were looking for is no longer available.",
        411 => "This endpoint requires a Content-Length header.",
        413 => "The request was too large for the server to process.",
        414 => "The requested URI was too long for the server to process.",
        415 => "The server does not support the media type of the request.",
        418 => "The server is apparently a teapot.",
        429 => "You have sent too many requests in a given amount of time.",
        431 => "The request header fields were too large for the server to process.",
        500 => "The page you were looking for experienced an error during internal processing.",
        501 => "The server does not support the functionality required by the request.",
        502 => "The server received an invalid response from an upstream server.",
        503 => "The page you were looking for is currently unavailable.",
        504 => "The server did not receive a response from an upstream server in time.",
        505 => "The HTTP version used by the request is not supported.",
        _ if status.is_client_error() => "The request could not be completed.",
        _ => "The server could not complete the request.",
    }
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_files::MockPageStore;
    use bytes::Bytes;
    use std::path::Path;

    fn renderer(custom_pages: &'static [&'static str], debug: bool) -> ErrorRenderer {
        let mut store = MockPageStore::new();
        store.expect_is_file().returning(move |path| custom_pages.iter().any(|page| path == Path::new(page)));
        store.expect_read().returning(|_| Ok(Bytes::from_static(b"<h1>custom</h1>")));
        ErrorRenderer::new("errors", debug, Arc::new(store))
    }

    fn body(response: &Response) -> String {
        String::from_utf8(response.body().unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn custom_page_is_sent_verbatim() {
        let response = renderer(&["errors/404/.html"], false).render(StatusCode::NOT_FOUND, Some("/missing"), None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), "<h1>custom</h1>");
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("content-length"), Some("15"));
    }

    #[tokio::test]
    async fn synthesized_page() {
        let response = renderer(&["errors/500/.html"], false).render(StatusCode::NOT_FOUND, Some("/missing"), None).await;
        let body = body(&response);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body.contains("<title>404 Not Found</title>"));
        assert!(body.contains("could not be found"));
        assert!(body.contains("/missing"));
        assert!(body.contains("https://http.cat/404.jpg"));
    }

    #[tokio::test]
    async fn traceback_only_in_debug() {
        let traceback = "division by zero\ncaused by: <bad input>";

        let response = renderer(&[], true).render(StatusCode::INTERNAL_SERVER_ERROR, Some("boom"), Some(traceback)).await;
        assert!(body(&response).contains("<pre>division by zero\ncaused by: &lt;bad input&gt;</pre>"));

        let response = renderer(&[], false).render(StatusCode::INTERNAL_SERVER_ERROR, Some("boom"), Some(traceback)).await;
        assert!(!body(&response).contains("<pre>"));
        assert!(!body(&response).contains("division by zero"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<script>alert("x&y")</script>"#), "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;");
    }
}
