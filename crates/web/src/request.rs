//! The request as seen by handlers.
//!
//! A [`Request`] is built once the dispatcher has found a match, and is immutable from
//! then on: the method, target, headers, the complete body (at most `Content-Length`
//! bytes), the remote address and the parameters captured by the matched pattern.

use crate::error::BodyDecodeError;
use crate::pattern::{ParamValue, PathParams};
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};
use mime::Mime;
use once_cell::sync::OnceCell;
use plus_http::protocol::PeerAddr;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

#[derive(Debug)]
pub struct Request {
    head: Parts,
    body: Bytes,
    params: PathParams,
    json: OnceCell<serde_json::Value>,
}

impl Request {
    /// Wraps a transport request; no parameters are attached yet.
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (head, body) = request.into_parts();
        Self { head, body, params: PathParams::empty(), json: OnceCell::new() }
    }

    #[must_use]
    pub(crate) fn with_params(mut self, params: PathParams) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.head.uri.query()
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// The value of header `name`, if present and visible ASCII.
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.head.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn content_type(&self) -> Option<Mime> {
        self.header(http::header::CONTENT_TYPE).and_then(|value| value.parse().ok())
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.head.extensions.get::<PeerAddr>().map(|peer_addr| peer_addr.0)
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// The converted value of path parameter `name`.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// The raw body bytes; empty when the request had no `Content-Length`.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Result<&str, BodyDecodeError> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    /// The body decoded as JSON. Decoding happens on first access and the result is kept.
    pub fn json_value(&self) -> Result<&serde_json::Value, BodyDecodeError> {
        self.json.get_or_try_init(|| serde_json::from_slice(&self.body)).map_err(BodyDecodeError::from)
    }

    /// The body decoded as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BodyDecodeError> {
        Ok(T::deserialize(self.json_value()?)?)
    }

    /// The body decoded as `application/x-www-form-urlencoded`.
    pub fn form<'a, T: Deserialize<'a>>(&'a self) -> Result<T, BodyDecodeError> {
        Ok(serde_urlencoded::from_bytes(&self.body)?)
    }

    /// The query string decoded into `T`; a missing query decodes like an empty one.
    pub fn query_as<'a, T: Deserialize<'a>>(&'a self) -> Result<T, BodyDecodeError> {
        Ok(serde_urlencoded::from_str(self.query().unwrap_or_default())?)
    }
}
