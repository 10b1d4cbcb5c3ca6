//! Error types of the framework.
//!
//! Registration problems ([`PatternError`], [`RouteError`]) are reported when routes are
//! added, before the server starts. Request-time problems ([`BodyDecodeError`],
//! [`ResponseError`]) are returned to handlers, which may propagate them with `?`; the
//! dispatcher then answers 500.

use crate::router::HttpMethod;
use std::fmt;
use thiserror::Error;

pub use plus_http::handler::BoxError;

/// A path pattern that can't be compiled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern '{pattern}' must start with '/'")]
    MissingLeadingSlash { pattern: String },

    #[error("pattern '{pattern}' has a parameter without a name")]
    EmptyParamName { pattern: String },

    #[error("pattern '{pattern}' has an unknown parameter type '{type_name}', expect one of str, int, float, bool")]
    UnknownParamType { pattern: String, type_name: String },

    #[error("pattern '{pattern}' has a malformed parameter '{segment}'")]
    MalformedParam { pattern: String, segment: String },

    #[error("pattern '{pattern}' declares parameter '{name}' more than once")]
    DuplicateParam { pattern: String, name: String },
}

/// The table a route was registered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Method(HttpMethod),
    Stream,
    GraphQl,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Method(method) => write!(f, "{method}"),
            Namespace::Stream => f.write_str("stream"),
            Namespace::GraphQl => f.write_str("graphql"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error("route conflict: '{pattern}' is already registered for {namespace}")]
    Conflict { namespace: Namespace, pattern: String },
}

impl RouteError {
    pub(crate) fn conflict(namespace: Namespace, pattern: impl Into<String>) -> Self {
        Self::Conflict { namespace, pattern: pattern.into() }
    }
}

/// A request method outside the eight standard ones, e.g. `CONNECT`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported method '{method}'")]
pub struct UnsupportedMethod {
    pub method: http::Method,
}

/// The request body can't be read in the requested form.
#[derive(Debug, Error)]
pub enum BodyDecodeError {
    #[error("request body is not valid utf-8: {source}")]
    Utf8 {
        #[from]
        source: std::str::Utf8Error,
    },

    #[error("request body is not valid json: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("can't decode urlencoded data: {source}")]
    Form {
        #[from]
        source: serde_urlencoded::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("invalid header name: {source}")]
    InvalidHeaderName {
        #[from]
        source: http::header::InvalidHeaderName,
    },

    #[error("invalid header value: {source}")]
    InvalidHeaderValue {
        #[from]
        source: http::header::InvalidHeaderValue,
    },

    #[error("can't encode body as json: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl From<std::convert::Infallible> for ResponseError {
    fn from(infallible: std::convert::Infallible) -> Self {
        match infallible {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_the_table() {
        let error = RouteError::conflict(Namespace::Method(HttpMethod::Get), "/kwtest/:testnum");
        assert_eq!(error.to_string(), "route conflict: '/kwtest/:testnum' is already registered for GET");

        let error = RouteError::conflict(Namespace::Stream, "/events");
        assert_eq!(error.to_string(), "route conflict: '/events' is already registered for stream");
    }

    #[test]
    fn pattern_error_is_transparent() {
        let error: RouteError = PatternError::UnknownParamType { pattern: "/a/:b:uuid".into(), type_name: "uuid".into() }.into();
        assert_eq!(error.to_string(), "pattern '/a/:b:uuid' has an unknown parameter type 'uuid', expect one of str, int, float, bool");
    }
}
