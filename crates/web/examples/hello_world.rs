use plus_web::{BoxError, Request, Response, Router, Server, handler_fn};
use serde::Deserialize;
use serde_json::json;

async fn kwtest(request: Request, mut response: Response) -> Result<Response, BoxError> {
    let testnum = request.param("testnum").map(ToString::to_string).unwrap_or_default();
    response.set_body(format!("<h1>testnum=\"{testnum}\"</h1>"));
    Ok(response)
}

#[derive(Deserialize)]
struct NewProduct {
    name: String,
    price: f64,
}

async fn create_product(request: Request, mut response: Response) -> Result<Response, BoxError> {
    let product: NewProduct = request.json()?;
    response.set_status(http::StatusCode::CREATED).set_body(json!({ "name": product.name, "price": product.price }));
    Ok(response)
}

async fn product(request: Request, mut response: Response) -> Result<Response, BoxError> {
    let id = request.param("id").and_then(|id| id.as_int()).unwrap_or_default();
    response.set_json(&json!({ "id": id }))?;
    Ok(response)
}

async fn old_home(_request: Request, mut response: Response) -> Result<Response, BoxError> {
    response.redirect("/")?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let mut router = Router::new();
    router
        .get("/kwtest/:testnum", handler_fn(kwtest))?
        .get("/product/:id:int", handler_fn(product))?
        .post("/product", handler_fn(create_product))?
        .get("/home", handler_fn(old_home))?;

    Server::builder().router(router).port(3000).debug(true).build()?.start().await;
    Ok(())
}
