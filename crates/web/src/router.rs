//! The route table.
//!
//! Each of the eight standard methods has its own ordered list of routes; the first route
//! whose pattern matches a path wins, so earlier registrations shadow later ones. Stream
//! handlers and GraphQL endpoints live in separate tables of their own.
//!
//! All registration happens before the server starts and reports problems immediately:
//! a malformed pattern or a duplicate registration is an error returned to the caller,
//! and nothing is registered in that case.

use crate::error::{Namespace, PatternError, RouteError, UnsupportedMethod};
use crate::graphql::{GraphQlEndpoint, GraphQlResolver, Schema};
use crate::handler::{RequestHandler, StreamHandler};
use crate::pattern::{PathParams, PathPattern};
use http::Method;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&Method> for HttpMethod {
    type Error = UnsupportedMethod;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        match *method {
            Method::GET => Ok(HttpMethod::Get),
            Method::POST => Ok(HttpMethod::Post),
            Method::PUT => Ok(HttpMethod::Put),
            Method::DELETE => Ok(HttpMethod::Delete),
            Method::PATCH => Ok(HttpMethod::Patch),
            Method::OPTIONS => Ok(HttpMethod::Options),
            Method::HEAD => Ok(HttpMethod::Head),
            Method::TRACE => Ok(HttpMethod::Trace),
            _ => Err(UnsupportedMethod { method: method.clone() }),
        }
    }
}

/// One entry of a method table.
#[derive(Clone)]
pub struct Route {
    pattern: String,
    target: RouteTarget,
}

#[derive(Clone)]
enum RouteTarget {
    /// Answered with a file or directory under the page root, matched by exact path only
    Static(PathBuf),
    Dynamic(PathPattern, Arc<dyn RequestHandler>),
}

impl Route {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_static(&self) -> bool {
        matches!(self.target, RouteTarget::Static(_))
    }

    /// The handler of a dynamic route.
    pub fn handler(&self) -> Option<&Arc<dyn RequestHandler>> {
        match &self.target {
            RouteTarget::Dynamic(_, handler) => Some(handler),
            RouteTarget::Static(_) => None,
        }
    }

    fn conflicts_with(&self, pattern: &PathPattern) -> bool {
        match &self.target {
            RouteTarget::Static(_) => self.pattern == pattern.as_str(),
            RouteTarget::Dynamic(existing, _) => existing.overlaps(pattern),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            RouteTarget::Static(target) => write!(f, "{} -> {}", self.pattern, target.display()),
            RouteTarget::Dynamic(..) => write!(f, "{} -> handler", self.pattern),
        }
    }
}

#[derive(Clone)]
struct StreamRoute {
    pattern: PathPattern,
    handler: Arc<dyn StreamHandler>,
}

#[derive(Default)]
pub struct Router {
    tables: [Vec<Route>; 8],
    streams: Vec<StreamRoute>,
    graphql: Vec<(String, GraphQlEndpoint)>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for method in HttpMethod::ALL {
            map.entry(&method.as_str(), &self.routes(method));
        }
        let streams = self.streams.iter().map(|route| route.pattern.as_str()).collect::<Vec<_>>();
        let endpoints = self.graphql.iter().map(|(endpoint, _)| endpoint.as_str()).collect::<Vec<_>>();
        map.entry(&"stream", &streams).entry(&"graphql", &endpoints).finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] for a malformed pattern, [`RouteError::Conflict`] when
    /// the same pattern is already registered for `method`.
    pub fn register(
        &mut self,
        method: HttpMethod,
        pattern: &str,
        handler: impl RequestHandler + 'static,
    ) -> Result<&mut Self, RouteError> {
        let compiled = PathPattern::parse(pattern)?;
        self.ensure_unregistered(method, pattern)?;
        self.tables[method.index()].push(Route { pattern: pattern.to_owned(), target: RouteTarget::Dynamic(compiled, Arc::new(handler)) });
        Ok(self)
    }

    /// Answers requests for exactly `path` with `target`, a file or directory relative to
    /// the page root. No pattern matching is involved.
    ///
    /// # Errors
    ///
    /// Fails when `path` doesn't start with `/` or is already registered for `method`.
    pub fn register_static(&mut self, method: HttpMethod, path: &str, target: impl Into<PathBuf>) -> Result<&mut Self, RouteError> {
        if !path.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash { pattern: path.to_owned() }.into());
        }
        self.ensure_unregistered(method, path)?;
        self.tables[method.index()].push(Route { pattern: path.to_owned(), target: RouteTarget::Static(target.into()) });
        Ok(self)
    }

    /// Registers `handler` for every standard method except `excluded`.
    ///
    /// Either all methods are registered or none: when any of them already has this
    /// pattern, or a pattern overlapping it, the call fails and the router is unchanged.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_all(
        &mut self,
        pattern: &str,
        handler: impl RequestHandler + 'static,
        excluded: &[HttpMethod],
    ) -> Result<&mut Self, RouteError> {
        let compiled = PathPattern::parse(pattern)?;
        let methods = HttpMethod::ALL.into_iter().filter(|method| !excluded.contains(method)).collect::<Vec<_>>();

        for &method in &methods {
            if self.tables[method.index()].iter().any(|route| route.conflicts_with(&compiled)) {
                return Err(RouteError::conflict(Namespace::Method(method), pattern));
            }
        }

        let handler: Arc<dyn RequestHandler> = Arc::new(handler);
        for method in methods {
            let target = RouteTarget::Dynamic(compiled.clone(), Arc::clone(&handler));
            self.tables[method.index()].push(Route { pattern: pattern.to_owned(), target });
        }
        Ok(self)
    }

    /// [`register_all`](Self::register_all) without exclusions.
    ///
    /// # Errors
    ///
    /// See [`register_all`](Self::register_all).
    pub fn all(&mut self, pattern: &str, handler: impl RequestHandler + 'static) -> Result<&mut Self, RouteError> {
        self.register_all(pattern, handler, &[])
    }

    /// Registers a server-sent events handler, reached by requests accepting
    /// `text/event-stream` that no method route answered.
    ///
    /// # Errors
    ///
    /// Fails on a malformed pattern or when `pattern` is already a stream route.
    pub fn register_stream(&mut self, pattern: &str, handler: impl StreamHandler + 'static) -> Result<&mut Self, RouteError> {
        let compiled = PathPattern::parse(pattern)?;
        if self.streams.iter().any(|route| route.pattern.as_str() == pattern) {
            return Err(RouteError::conflict(Namespace::Stream, pattern));
        }
        self.streams.push(StreamRoute { pattern: compiled, handler: Arc::new(handler) });
        Ok(self)
    }

    /// Serves `schema` through `resolver` at exactly `endpoint`.
    ///
    /// # Errors
    ///
    /// Fails when `endpoint` doesn't start with `/` or already serves a schema.
    pub fn register_graphql(
        &mut self,
        endpoint: &str,
        schema: Schema,
        resolver: impl GraphQlResolver + 'static,
    ) -> Result<&mut Self, RouteError> {
        if !endpoint.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash { pattern: endpoint.to_owned() }.into());
        }
        if self.graphql.iter().any(|(registered, _)| registered == endpoint) {
            return Err(RouteError::conflict(Namespace::GraphQl, endpoint));
        }
        self.graphql.push((endpoint.to_owned(), GraphQlEndpoint::new(schema, resolver)));
        Ok(self)
    }

    /// The routes of `method`, in registration order.
    pub fn routes(&self, method: HttpMethod) -> &[Route] {
        &self.tables[method.index()]
    }

    /// The static route registered for exactly `path`.
    pub fn static_target(&self, method: HttpMethod, path: &str) -> Option<&Path> {
        self.routes(method).iter().find_map(|route| match &route.target {
            RouteTarget::Static(target) if route.pattern == path => Some(target.as_path()),
            _ => None,
        })
    }

    /// The first dynamic route of `method` matching `path`.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<(&Arc<dyn RequestHandler>, PathParams)> {
        self.routes(method).iter().find_map(|route| match &route.target {
            RouteTarget::Dynamic(pattern, handler) => pattern.matches(path).map(|params| (handler, params)),
            RouteTarget::Static(_) => None,
        })
    }

    /// The first stream route matching `path`.
    pub fn find_stream(&self, path: &str) -> Option<(&Arc<dyn StreamHandler>, PathParams)> {
        self.streams.iter().find_map(|route| route.pattern.matches(path).map(|params| (&route.handler, params)))
    }

    pub fn graphql_endpoint(&self, path: &str) -> Option<&GraphQlEndpoint> {
        self.graphql.iter().find(|(endpoint, _)| endpoint == path).map(|(_, endpoint)| endpoint)
    }

    fn ensure_unregistered(&self, method: HttpMethod, pattern: &str) -> Result<(), RouteError> {
        if self.routes(method).iter().any(|route| route.pattern == pattern) {
            return Err(RouteError::conflict(Namespace::Method(method), pattern));
        }
        Ok(())
    }
}

macro_rules! method_route {
    ($($name:ident => $method:ident),* $(,)?) => {
        impl Router {
            $(
                #[doc = concat!("Registers `handler` for `", stringify!($method), "` requests; see [`register`](Self::register).")]
                ///
                /// # Errors
                ///
                /// See [`register`](Self::register).
                pub fn $name(&mut self, pattern: &str, handler: impl RequestHandler + 'static) -> Result<&mut Self, RouteError> {
                    self.register(HttpMethod::$method, pattern, handler)
                }
            )*
        }
    };
}

method_route! {
    get => Get,
    post => Post,
    put => Put,
    delete => Delete,
    patch => Patch,
    options => Options,
    head => Head,
    trace => Trace,
}
