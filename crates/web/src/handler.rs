//! Handler contracts.
//!
//! A [`RequestHandler`] takes the request and a fresh response and returns the response it
//! wants sent. A [`StreamHandler`] pushes server-sent events through an [`EventEmitter`]
//! for as long as it likes. Both are usually built from async functions with
//! [`handler_fn`] and [`stream_fn`].

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;
use crate::sse::EventEmitter;
use async_trait::async_trait;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, request: Request, response: Response) -> Result<Response, BoxError>;
}

#[async_trait]
pub trait StreamHandler: Send + Sync {
    /// Produces events until done; returning ends the response.
    async fn stream(&self, request: Request, emitter: EventEmitter) -> Result<(), BoxError>;
}

/// An async fn holder which represents a [`RequestHandler`]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut, E>(f: F) -> FnHandler<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut, E> RequestHandler for FnHandler<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn invoke(&self, request: Request, response: Response) -> Result<Response, BoxError> {
        (self.f)(request, response).await.map_err(Into::into)
    }
}

/// An async fn holder which represents a [`StreamHandler`]
pub struct FnStreamHandler<F> {
    f: F,
}

pub fn stream_fn<F, Fut, E>(f: F) -> FnStreamHandler<F>
where
    F: Fn(Request, EventEmitter) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    FnStreamHandler { f }
}

#[async_trait]
impl<F, Fut, E> StreamHandler for FnStreamHandler<F>
where
    F: Fn(Request, EventEmitter) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn stream(&self, request: Request, emitter: EventEmitter) -> Result<(), BoxError> {
        (self.f)(request, emitter).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BodyDecodeError;
    use crate::sse::{Event, event_channel};
    use bytes::Bytes;
    use futures::StreamExt;
    use http::StatusCode;

    fn request(body: &'static str) -> Request {
        Request::from_http(http::Request::builder().uri("/echo").body(Bytes::from_static(body.as_bytes())).unwrap())
    }

    async fn echo(request: Request, mut response: Response) -> Result<Response, BodyDecodeError> {
        let text = request.text()?.to_owned();
        response.set_status(StatusCode::CREATED).set_body(text);
        Ok(response)
    }

    #[tokio::test]
    async fn fn_handler_returns_response() {
        let handler = handler_fn(echo);
        let response = handler.invoke(request("hello"), Response::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body(), Some(&Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn fn_handler_error_is_boxed() {
        let handler = handler_fn(echo);
        let invalid = Request::from_http(http::Request::builder().body(Bytes::from_static(&[0xff, 0xfe])).unwrap());
        let error = handler.invoke(invalid, Response::new()).await.unwrap_err();
        assert!(error.to_string().starts_with("request body is not valid utf-8"));
    }

    #[tokio::test]
    async fn stream_fn_pushes_events() {
        let handler = stream_fn(|_request, mut emitter: EventEmitter| async move {
            emitter.send(Event::data("1")).await?;
            emitter.send(Event::data("2")).await
        });

        let (emitter, stream) = event_channel();
        let producer = tokio::spawn(async move { handler.stream(request(""), emitter).await });

        let events = stream.collect::<Vec<_>>().await;
        assert_eq!(events, vec![Event::data("1"), Event::data("2")]);
        assert!(producer.await.unwrap().is_ok());
    }
}
