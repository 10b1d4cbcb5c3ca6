//! The response a handler fills in.
//!
//! Handlers receive a fresh [`Response`] (status 200, no headers, empty body) and return
//! it after setting what they need. Setting a body always updates `Content-Length`; the
//! body kind decides `Content-Type`:
//!
//! | body                  | stored as      | `Content-Type`                |
//! |-----------------------|----------------|-------------------------------|
//! | `serde_json::Value`   | JSON text      | `application/json`            |
//! | `String` / `&str`     | text as-is     | unchanged                     |
//! | `Bytes` / `Vec<u8>`   | bytes as-is    | `application/octet-stream`    |
//!
//! ```
//! use plus_web::Response;
//! use serde_json::json;
//!
//! let mut response = Response::new();
//! response.set_body(json!({"a": 1}));
//! assert_eq!(response.header("content-type"), Some("application/json"));
//! assert_eq!(response.header("content-length"), Some("7"));
//! ```

use crate::error::ResponseError;
use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use std::path::PathBuf;

/// A body value accepted by [`Response::set_body`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
    Json(serde_json::Value),
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_owned())
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Binary(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Binary(value.into())
    }
}

impl From<&'static [u8]> for Payload {
    fn from(value: &'static [u8]) -> Self {
        Payload::Binary(Bytes::from_static(value))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// What the response body is made of when the dispatcher sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Content {
    Bytes(Bytes),
    /// A file under the page root, read when the response is sent
    File(PathBuf),
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    content: Content,
    linked: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), content: Content::Bytes(Bytes::new()), linked: false }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The value of header `name`, if present and visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Sets header `name`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Fails when the name or value is not a valid header name or value.
    pub fn set_header<K, V>(&mut self, name: K, value: V) -> Result<&mut Self, ResponseError>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<ResponseError>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<ResponseError>,
    {
        let name = HeaderName::try_from(name).map_err(Into::into)?;
        let value = HeaderValue::try_from(value).map_err(Into::into)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces the body, updating `Content-Length` and, for JSON and binary payloads,
    /// `Content-Type`.
    pub fn set_body(&mut self, body: impl Into<Payload>) -> &mut Self {
        let bytes = match body.into() {
            Payload::Text(text) => Bytes::from(text),
            Payload::Binary(bytes) => {
                self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
                bytes
            }
            Payload::Json(value) => {
                self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Bytes::from(value.to_string())
            }
        };
        self.set_content(bytes);
        self
    }

    /// Serializes `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Fails when `value` can't be represented as JSON, e.g. a map with non-string keys.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, ResponseError> {
        let bytes = serde_json::to_vec(value)?;
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.set_content(Bytes::from(bytes));
        Ok(self)
    }

    /// The body set so far; `None` while the body is a file that hasn't been read yet.
    pub fn body(&self) -> Option<&Bytes> {
        match &self.content {
            Content::Bytes(bytes) => Some(bytes),
            Content::File(_) => None,
        }
    }

    /// Redirects to `target` with `302 Found`. A linked response is sent without a body.
    ///
    /// # Errors
    ///
    /// Fails when `target` is not a valid header value.
    pub fn redirect(&mut self, target: &str) -> Result<&mut Self, ResponseError> {
        let location = HeaderValue::try_from(target)?;
        self.headers.insert(header::LOCATION, location);
        self.status = StatusCode::FOUND;
        self.linked = true;
        Ok(self)
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Answers with the file at `path`, relative to the page root. The file is read and its
    /// content type resolved when the response is sent; a missing file turns into a 404.
    pub fn serve_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.headers.remove(header::CONTENT_LENGTH);
        self.content = Content::File(path.into());
        self
    }

    /// Like [`serve_file`](Self::serve_file), but asks the client to save the file as
    /// `filename` (or the file's own name).
    ///
    /// # Errors
    ///
    /// Fails when the file name can't be put in a header.
    pub fn download(&mut self, path: impl Into<PathBuf>, filename: Option<&str>) -> Result<&mut Self, ResponseError> {
        let path = path.into();
        let filename = filename
            .map(str::to_owned)
            .or_else(|| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "download".to_owned());
        let filename = filename.replace(['"', '\\'], "");

        let disposition = HeaderValue::try_from(format!("attachment; filename=\"{filename}\""))?;
        self.headers.insert(header::CONTENT_DISPOSITION, disposition);
        Ok(self.serve_file(path))
    }

    fn set_content(&mut self, bytes: Bytes) {
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        self.content = Content::Bytes(bytes);
    }

    pub(crate) fn into_parts(self) -> (StatusCode, HeaderMap, Content, bool) {
        (self.status, self.headers, self.content, self.linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body() {
        let mut response = Response::new();
        response.set_body(json!({"a": 1}));

        assert_eq!(response.body().unwrap().as_ref(), br#"{"a":1}"#);
        assert_eq!(response.header(header::CONTENT_TYPE), Some("application/json"));
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("7"));
    }

    #[test]
    fn text_body_keeps_content_type() {
        let mut response = Response::new();
        response.set_header("Content-Type", "text/plain").unwrap().set_body("héllo");

        assert_eq!(response.header(header::CONTENT_TYPE), Some("text/plain"));
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("6"));
    }

    #[test]
    fn binary_body() {
        let mut response = Response::new();
        response.set_body(vec![0_u8, 159, 146, 150]);

        assert_eq!(response.header(header::CONTENT_TYPE), Some("application/octet-stream"));
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("4"));
    }

    #[test]
    fn content_length_follows_latest_body() {
        let mut response = Response::new();
        response.set_body("a longer body").set_body("short");
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("5"));
    }

    #[test]
    fn set_json_from_serialize() {
        #[derive(Serialize)]
        struct Item<'a> {
            name: &'a str,
        }

        let mut response = Response::new();
        response.set_json(&Item { name: "widget" }).unwrap();
        assert_eq!(response.body().unwrap().as_ref(), br#"{"name":"widget"}"#);
    }

    #[test]
    fn redirect_is_linked() {
        let mut response = Response::new();
        response.redirect("/login").unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.header(header::LOCATION), Some("/login"));
        assert!(response.is_linked());
    }

    #[test]
    fn invalid_header() {
        let mut response = Response::new();
        assert!(matches!(response.set_header("bad header", "x"), Err(ResponseError::InvalidHeaderName { .. })));
        assert!(matches!(response.set_header("X-Ok", "line\nbreak"), Err(ResponseError::InvalidHeaderValue { .. })));
        assert!(response.set_header(header::CACHE_CONTROL, HeaderValue::from_static("no-store")).is_ok());
    }

    #[test]
    fn download_sets_disposition() {
        let mut response = Response::new();
        response.download("files/report.pdf", None).unwrap();

        assert_eq!(response.header(header::CONTENT_DISPOSITION), Some("attachment; filename=\"report.pdf\""));
        assert!(response.body().is_none());
        assert_eq!(response.into_parts().2, Content::File(PathBuf::from("files/report.pdf")));
    }
}
