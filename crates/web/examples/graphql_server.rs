use plus_web::graphql::{GraphQlContext, OperationType, Schema, resolver_fn};
use plus_web::{BoxError, Router, Server};
use serde_json::{Value, json};

const SCHEMA: &str = r"
type Query {
    book(id: ID!): Book
}

type Book {
    id: ID!
    title: String
}
";

async fn resolve(context: GraphQlContext) -> Result<Value, BoxError> {
    match context.operation_type() {
        OperationType::Query => {
            let id = context.variable("id").and_then(Value::as_str).unwrap_or("1");
            Ok(json!({ "book": { "id": id, "title": "The Left Hand of Darkness" } }))
        }
        other => Err(format!("{other} is not supported").into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let mut router = Router::new();
    router.register_graphql("/graphql", Schema::new(SCHEMA), resolver_fn(resolve))?;

    // curl -H 'Content-Type: application/graphql' -d '{ book(id: 1) { title } }' http://127.0.0.1:8080/graphql
    Server::builder().router(router).debug(true).build()?.start().await;
    Ok(())
}
