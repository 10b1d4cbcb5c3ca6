//! GraphQL endpoints.
//!
//! The framework does not execute GraphQL documents itself. It decodes the request
//! envelope, checks that the requested operation type is declared by the endpoint's
//! [`Schema`], and hands everything to a [`GraphQlResolver`], whose result is wrapped the
//! way GraphQL-over-HTTP clients expect:
//!
//! | outcome                                   | status | body                          |
//! |-------------------------------------------|--------|-------------------------------|
//! | resolver returned `Ok(v)`                 | 200    | `{"data": v}`                 |
//! | resolver returned `Err(e)`                | 500    | `{"errors":[{"message": e}]}` |
//! | bad envelope or undeclared operation type | 400    | `{"errors":[{"message": ..}]}`|

use crate::error::{BodyDecodeError, BoxError};
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "query" => Some(OperationType::Query),
            "mutation" => Some(OperationType::Mutation),
            "subscription" => Some(OperationType::Subscription),
            _ => None,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        })
    }
}

/// A schema in SDL form.
#[derive(Debug, Clone)]
pub struct Schema {
    sdl: String,
    mutation: bool,
    subscription: bool,
}

impl Schema {
    pub fn new(sdl: impl Into<String>) -> Self {
        let sdl = sdl.into();
        let stripped = strip_ignored(&sdl);
        let words = words_of(&stripped).collect::<Vec<_>>();

        let declares = |root: &str, keyword: &str| {
            words.windows(2).any(|pair| pair[0] == "type" && pair[1] == root)
                || schema_block(&stripped).is_some_and(|block| words_of(block).any(|word| word == keyword))
        };

        let mutation = declares("Mutation", "mutation");
        let subscription = declares("Subscription", "subscription");
        Self { sdl, mutation, subscription }
    }

    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    /// Whether the schema has a root type for `operation`; `Query` always does.
    pub fn declares(&self, operation: OperationType) -> bool {
        match operation {
            OperationType::Query => true,
            OperationType::Mutation => self.mutation,
            OperationType::Subscription => self.subscription,
        }
    }
}

/// `text` with comments removed and every string literal (block strings included)
/// replaced by `""`, leaving only the tokens that shape a document.
fn strip_ignored(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find(['#', '"']) {
        stripped.push_str(&rest[..index]);
        rest = &rest[index..];

        if rest.starts_with('#') {
            rest = rest.find(['\n', '\r']).map_or("", |end| &rest[end..]);
            continue;
        }

        stripped.push_str("\"\"");
        rest = if let Some(block) = rest.strip_prefix("\"\"\"") {
            block_string_end(block).map_or("", |end| &block[end..])
        } else {
            let body = &rest[1..];
            string_end(body).map_or("", |end| &body[end..])
        };
    }
    stripped.push_str(rest);
    stripped
}

/// Offset just past the closing quote of a string whose opening quote was consumed.
fn string_end(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(index + 1),
            _ => {}
        }
    }
    None
}

/// Offset just past the closing `"""` of a block string; `\"""` does not close it.
fn block_string_end(body: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(index) = body[from..].find("\"\"\"") {
        let at = from + index;
        if !body[..at].ends_with('\\') {
            return Some(at + 3);
        }
        from = at + 3;
    }
    None
}

fn words_of(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_')).filter(|word| !word.is_empty())
}

/// The body of a `schema { .. }` definition in a stripped SDL, if any.
fn schema_block(sdl: &str) -> Option<&str> {
    let mut rest = sdl;
    while let Some(index) = rest.find("schema") {
        let before = rest[..index].chars().next_back();
        let after = rest[index + "schema".len()..].trim_start();
        let standalone = before.is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        if standalone && after.starts_with('{') {
            let end = after.find('}')?;
            return Some(&after[1..end]);
        }
        rest = &rest[index + "schema".len()..];
    }
    None
}

/// The type of the operation a document asks for: the one named `operation_name`, or the
/// first one in the document.
pub fn operation_type(document: &str, operation_name: Option<&str>) -> Option<OperationType> {
    let document = strip_ignored(document);
    let mut depth = 0usize;
    let mut pending: Option<OperationType> = None;
    let mut word = String::new();
    let mut saw_word = false;

    for c in document.chars().chain(std::iter::once(' ')) {
        if depth == 0 && (c.is_alphanumeric() || c == '_') {
            word.push(c);
            continue;
        }

        if !word.is_empty() {
            if let (Some(kind), Some(name)) = (pending.take(), operation_name)
                && word == name
            {
                return Some(kind);
            }
            pending = OperationType::from_keyword(&word);
            if operation_name.is_none() && pending.is_some() {
                return pending;
            }
            saw_word = true;
            word.clear();
        }

        match c {
            '{' => {
                // `{ .. }` without a keyword is the query shorthand
                if depth == 0 && !saw_word && operation_name.is_none() {
                    return Some(OperationType::Query);
                }
                pending = None;
                saw_word = false;
                depth += 1;
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    None
}

/// What a GraphQL client sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Value>,
    #[serde(default, rename = "operationName")]
    pub operation_name: Option<String>,
}

#[derive(Deserialize)]
struct QueryStringEnvelope {
    query: String,
    variables: Option<String>,
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
}

impl GraphQlRequest {
    /// Reads the envelope from the query string (`GET`), a raw `application/graphql` body
    /// or a JSON body.
    ///
    /// # Errors
    ///
    /// Fails when the envelope can't be decoded.
    pub fn from_request(request: &Request) -> Result<Self, BodyDecodeError> {
        if request.method() == Method::GET {
            let envelope: QueryStringEnvelope = request.query_as()?;
            let variables = envelope.variables.as_deref().map(serde_json::from_str).transpose()?;
            return Ok(Self { query: envelope.query, variables, operation_name: envelope.operation_name });
        }

        let raw_query = request.content_type().is_some_and(|mime| mime.essence_str() == "application/graphql");
        if raw_query {
            return Ok(Self { query: request.text()?.to_owned(), variables: None, operation_name: None });
        }

        request.json()
    }
}

/// Everything a resolver gets for one operation.
#[derive(Debug)]
pub struct GraphQlContext {
    operation: OperationType,
    payload: GraphQlRequest,
    request: Request,
}

impl GraphQlContext {
    pub fn operation_type(&self) -> OperationType {
        self.operation
    }

    pub fn query(&self) -> &str {
        &self.payload.query
    }

    pub fn variables(&self) -> Option<&Value> {
        self.payload.variables.as_ref()
    }

    /// The variable `name`, if the client sent it.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables().and_then(|variables| variables.get(name))
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.payload.operation_name.as_deref()
    }

    /// The HTTP request the operation came with.
    pub fn request(&self) -> &Request {
        &self.request
    }
}

#[async_trait]
pub trait GraphQlResolver: Send + Sync {
    async fn resolve(&self, context: GraphQlContext) -> Result<Value, BoxError>;
}

pub struct FnResolver<F> {
    f: F,
}

pub fn resolver_fn<F, Fut, E>(f: F) -> FnResolver<F>
where
    F: Fn(GraphQlContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    FnResolver { f }
}

#[async_trait]
impl<F, Fut, E> GraphQlResolver for FnResolver<F>
where
    F: Fn(GraphQlContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn resolve(&self, context: GraphQlContext) -> Result<Value, BoxError> {
        (self.f)(context).await.map_err(Into::into)
    }
}

/// A schema with the resolver serving it, registered at one path.
#[derive(Clone)]
pub struct GraphQlEndpoint {
    schema: Schema,
    resolver: Arc<dyn GraphQlResolver>,
}

impl fmt::Debug for GraphQlEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQlEndpoint").field("schema", &self.schema).finish_non_exhaustive()
    }
}

impl GraphQlEndpoint {
    pub fn new(schema: Schema, resolver: impl GraphQlResolver + 'static) -> Self {
        Self { schema, resolver: Arc::new(resolver) }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Runs one request through the resolver and builds the JSON response.
    pub async fn execute(&self, request: Request, debug: bool) -> Response {
        let payload = match GraphQlRequest::from_request(&request) {
            Ok(payload) => payload,
            Err(e) => return errors(StatusCode::BAD_REQUEST, &e.to_string()),
        };

        let Some(operation) = operation_type(&payload.query, payload.operation_name.as_deref()) else {
            return errors(StatusCode::BAD_REQUEST, "no operation found in query");
        };
        if !self.schema.declares(operation) {
            return errors(StatusCode::BAD_REQUEST, &format!("schema does not support {operation} operations"));
        }

        let path = request.path().to_owned();
        match self.resolver.resolve(GraphQlContext { operation, payload, request }).await {
            Ok(data) => {
                let mut response = Response::new();
                response.set_body(json!({ "data": data }));
                response
            }
            Err(e) => {
                error!(cause = %e, path = %path, "graphql resolver failed");
                let message = if debug { e.to_string() } else { "internal server error".to_owned() };
                errors(StatusCode::INTERNAL_SERVER_ERROR, &message)
            }
        }
    }
}

fn errors(status: StatusCode, message: &str) -> Response {
    let mut response = Response::new();
    response.set_status(status).set_body(json!({ "errors": [{ "message": message }] }));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use indoc::indoc;

    const SDL: &str = indoc! {r#"
        # books and authors
        type Query {
            book(id: ID!): Book
        }

        type Mutation {
            addBook(title: String!): Book
        }

        type Book {
            id: ID!
            title: String
        }
    "#};

    fn post(content_type: &str, body: &'static str) -> Request {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(http::header::CONTENT_TYPE, content_type)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        Request::from_http(request)
    }

    fn endpoint() -> GraphQlEndpoint {
        let resolver = resolver_fn(|context: GraphQlContext| async move {
            match context.variable("id").and_then(Value::as_str) {
                Some("boom") => Err(BoxError::from("book store unavailable")),
                Some(id) => Ok(json!({ "book": { "id": id, "title": "Dune" } })),
                None => Ok(json!({ "operation": context.operation_type().to_string() })),
            }
        });
        GraphQlEndpoint::new(Schema::new(SDL), resolver)
    }

    fn body_json(response: &Response) -> Value {
        serde_json::from_slice(response.body().unwrap()).unwrap()
    }

    #[test]
    fn schema_roots() {
        let schema = Schema::new(SDL);
        assert!(schema.declares(OperationType::Query));
        assert!(schema.declares(OperationType::Mutation));
        assert!(!schema.declares(OperationType::Subscription));

        let schema = Schema::new("schema { query: Root subscription: Events }\ntype Root { a: Int }");
        assert!(schema.declares(OperationType::Subscription));
        assert!(!schema.declares(OperationType::Mutation));

        let schema = Schema::new("# type Mutation { x: Int }\ntype Query { a: Int }");
        assert!(!schema.declares(OperationType::Mutation));

        let schema = Schema::new(indoc! {r##"
            """
            Read only: there is no type Mutation here.
            """
            type Query { color(hex: String = "#fff"): String }
            type Subscription { ticks: Int }
        "##});
        assert!(!schema.declares(OperationType::Mutation));
        assert!(schema.declares(OperationType::Subscription));
    }

    #[test]
    fn operation_types() {
        assert_eq!(operation_type("{ book(id: 1) { title } }", None), Some(OperationType::Query));
        assert_eq!(operation_type("query Q { a }", None), Some(OperationType::Query));
        assert_eq!(operation_type("mutation { addBook(title: \"x\") { id } }", None), Some(OperationType::Mutation));
        assert_eq!(
            operation_type("fragment F on Book { id } subscription S { books { ...F } }", None),
            Some(OperationType::Subscription)
        );

        let document = "query A { a } mutation B { b }";
        assert_eq!(operation_type(document, Some("B")), Some(OperationType::Mutation));
        assert_eq!(operation_type(document, Some("A")), Some(OperationType::Query));
        assert_eq!(operation_type(document, Some("C")), None);
        assert_eq!(operation_type("", None), None);
    }

    #[test]
    fn operation_types_past_string_literals() {
        let escaped_quote = r#"query A { a(s: "x\"y") } mutation B { b }"#;
        assert_eq!(operation_type(escaped_quote, Some("B")), Some(OperationType::Mutation));

        let hash_in_string = "query A { a(s: \"#fff\") }\nmutation B { b }";
        assert_eq!(operation_type(hash_in_string, Some("B")), Some(OperationType::Mutation));

        let brace_in_string = r#"query A { a(s: "}") } mutation B { b }"#;
        assert_eq!(operation_type(brace_in_string, Some("B")), Some(OperationType::Mutation));

        let block_string = indoc! {r##"
            query A { a(text: """
              a "quoted" word, a \""" and a { brace
            """) }
            subscription B { b } # mutation C { c }
        "##};
        assert_eq!(operation_type(block_string, Some("B")), Some(OperationType::Subscription));
        assert_eq!(operation_type(block_string, Some("C")), None);
    }

    #[test]
    fn envelope_from_get() {
        let request = http::Request::builder()
            .uri("/graphql?query=%7Bbook%7D&variables=%7B%22id%22%3A%227%22%7D&operationName=Q")
            .body(Bytes::new())
            .unwrap();
        let payload = GraphQlRequest::from_request(&Request::from_http(request)).unwrap();

        assert_eq!(payload.query, "{book}");
        assert_eq!(payload.variables, Some(json!({"id": "7"})));
        assert_eq!(payload.operation_name.as_deref(), Some("Q"));
    }

    #[test]
    fn envelope_from_raw_body() {
        let payload = GraphQlRequest::from_request(&post("application/graphql", "{ book { id } }")).unwrap();
        assert_eq!(payload.query, "{ book { id } }");
        assert_eq!(payload.variables, None);
    }

    #[tokio::test]
    async fn resolved_data() {
        let request = post("application/json", r#"{"query": "query ($id: ID!) { book(id: $id) { title } }", "variables": {"id": "7"}}"#);
        let response = endpoint().execute(request, false).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(body_json(&response), json!({"data": {"book": {"id": "7", "title": "Dune"}}}));
    }

    #[tokio::test]
    async fn mutation_reaches_resolver() {
        let response = endpoint().execute(post("application/graphql", "mutation { addBook(title: \"x\") { id } }"), false).await;
        assert_eq!(body_json(&response), json!({"data": {"operation": "mutation"}}));
    }

    #[tokio::test]
    async fn named_operation_after_quoted_argument() {
        let body = r##"{"query": "query A { book(id: \"#1 \\\"best\\\"\") { title } } mutation B { addBook(title: \"x\") { id } }", "operationName": "B"}"##;
        let response = endpoint().execute(post("application/json", body), false).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(&response), json!({"data": {"operation": "mutation"}}));
    }

    #[tokio::test]
    async fn undeclared_operation_is_bad_request() {
        let response = endpoint().execute(post("application/graphql", "subscription { books { id } }"), false).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(&response)["errors"][0]["message"], "schema does not support subscription operations");
    }

    #[tokio::test]
    async fn malformed_envelope_is_bad_request() {
        let response = endpoint().execute(post("application/json", "{\"nope\": 1}"), false).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(&response)["errors"][0]["message"].is_string());
    }

    #[tokio::test]
    async fn resolver_error_depends_on_debug() {
        let body = r#"{"query": "{ book(id: $id) { id } }", "variables": {"id": "boom"}}"#;

        let response = endpoint().execute(post("application/json", body), true).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&response), json!({"errors": [{"message": "book store unavailable"}]}));

        let response = endpoint().execute(post("application/json", body), false).await;
        assert_eq!(body_json(&response), json!({"errors": [{"message": "internal server error"}]}));
    }
}
