//! Server-sent events.
//!
//! A stream handler runs in its own task and pushes [`Event`]s through an
//! [`EventEmitter`]; the matching [`EventStream`] becomes the response body. The channel
//! between them holds a single event, so `send` waits until the connection has taken
//! the previous one. Dropping the body (the client went away, a write failed) aborts
//! the producing task.

use crate::body::ResponseBody;
use bytes::Bytes;
use futures::channel::mpsc::{Receiver, Sender, channel};
use futures::{SinkExt, Stream, StreamExt};
use http::{HeaderMap, HeaderValue, Response, StatusCode, header};
use http_body::Frame;
use http_body_util::StreamBody;
use plus_http::protocol::HttpError;
use std::fmt::Write;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Retry(Duration),
    Message(Message),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    // https://html.spec.whatwg.org/multipage/server-sent-events.html#concept-event-stream-last-event-id
    pub id: Option<String>,
    pub name: Option<String>,
    pub data: String,
}

impl Event {
    /// An unnamed message event.
    pub fn data(data: impl Into<String>) -> Event {
        Event::Message(Message { id: None, name: None, data: data.into() })
    }

    /// A message event dispatched to listeners of `name`.
    pub fn named(name: impl Into<String>, data: impl Into<String>) -> Event {
        Event::Message(Message { id: None, name: Some(name.into()), data: data.into() })
    }

    pub fn retry(duration: impl Into<Duration>) -> Event {
        Event::Retry(duration.into())
    }

    /// Sets the event id; no effect on a retry event.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Event {
        if let Event::Message(message) = &mut self {
            message.id = Some(id.into());
        }
        self
    }

    /// Sets the event name; no effect on a retry event.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Event {
        if let Event::Message(message) = &mut self {
            message.name = Some(name.into());
        }
        self
    }

    /// The wire form of the event, terminated by an empty line.
    pub fn to_bytes(&self) -> Bytes {
        let mut frame = String::new();
        match self {
            Event::Message(Message { id, name, data }) => {
                if let Some(id) = id {
                    let _ = write!(frame, "id: {}\r\n", single_line(id));
                }
                if let Some(name) = name {
                    let _ = write!(frame, "event: {}\r\n", single_line(name));
                }
                for line in data.split('\n') {
                    let line = line.strip_suffix('\r').unwrap_or(line);
                    let _ = write!(frame, "data: {line}\r\n");
                }
            }
            Event::Retry(duration) => {
                let _ = write!(frame, "retry: {}\r\n", duration.as_millis());
            }
        }
        frame.push_str("\r\n");
        Bytes::from(frame)
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}

/// Sending on a stream whose client is gone.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event stream closed")]
pub struct StreamClosed;

/// The producing side handed to stream handlers.
#[derive(Debug)]
pub struct EventEmitter {
    sender: Sender<Event>,
}

impl EventEmitter {
    /// Sends one event, waiting until the previous one was taken by the connection.
    ///
    /// # Errors
    ///
    /// [`StreamClosed`] once the response body has been dropped.
    pub async fn send(&mut self, event: Event) -> Result<(), StreamClosed> {
        self.sender.send(event).await.map_err(|_| StreamClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The consuming side, used as the response body.
pub struct EventStream {
    receiver: Receiver<Event>,
    producer: Option<AbortOnDrop>,
}

impl EventStream {
    /// Ties the producing task to this stream: dropping the stream aborts the task.
    #[must_use]
    pub fn abort_on_drop(mut self, producer: JoinHandle<()>) -> Self {
        self.producer = Some(AbortOnDrop(producer));
        self
    }

    /// Wraps the stream in a `200 OK` `text/event-stream` response.
    pub fn into_response(self) -> Response<ResponseBody> {
        let frames = self.map(|event| Ok::<_, HttpError>(Frame::data(event.to_bytes())));

        let mut response = Response::new(ResponseBody::stream(StreamBody::new(frames)));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        response
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").field("has_producer", &self.producer.is_some()).finish_non_exhaustive()
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_next_unpin(cx)
    }
}

/// Creates a connected emitter/stream pair holding at most one pending event.
pub fn event_channel() -> (EventEmitter, EventStream) {
    let (sender, receiver) = channel::<Event>(0);
    (EventEmitter { sender }, EventStream { receiver, producer: None })
}

/// Whether the request's `Accept` header lists `text/event-stream`.
pub fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|media_range| media_range.trim().parse::<mime::Mime>().ok())
        .any(|media_type| media_type.essence_str() == "text/event-stream")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tokio::sync::oneshot;

    #[test]
    fn named_event_frame() {
        assert_eq!(Event::named("test", "0").to_bytes(), Bytes::from_static(b"event: test\r\ndata: 0\r\n\r\n"));
        assert_eq!(Event::data("7").name("test").to_bytes(), Event::named("test", "7").to_bytes());
    }

    #[test]
    fn full_event_frame() {
        let event = Event::data("line one\nline two").id("42").name("update");
        assert_eq!(event.to_bytes(), Bytes::from_static(b"id: 42\r\nevent: update\r\ndata: line one\r\ndata: line two\r\n\r\n"));
    }

    #[test]
    fn retry_frame() {
        assert_eq!(Event::retry(Duration::from_secs(3)).id("ignored").to_bytes(), Bytes::from_static(b"retry: 3000\r\n\r\n"));
    }

    #[test]
    fn name_cannot_break_framing() {
        assert_eq!(Event::named("a\r\nb", "x").to_bytes(), Bytes::from_static(b"event: ab\r\ndata: x\r\n\r\n"));
    }

    #[test]
    fn accept_header_matching() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        assert!(accepts_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html, text/event-stream;q=0.9"));
        assert!(accepts_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        assert!(!accepts_event_stream(&headers));
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (mut emitter, stream) = event_channel();
        let producer = tokio::spawn(async move {
            for i in 0..2 {
                emitter.send(Event::named("test", i.to_string())).await.unwrap();
            }
        });

        let response = stream.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::CONNECTION], "keep-alive");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"event: test\r\ndata: 0\r\n\r\nevent: test\r\ndata: 1\r\n\r\n"));
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (mut emitter, stream) = event_channel();
        drop(stream);
        assert!(emitter.is_closed());
        assert_eq!(emitter.send(Event::data("late")).await, Err(StreamClosed));
    }

    #[tokio::test]
    async fn dropping_stream_aborts_producer() {
        let (emitter, stream) = event_channel();
        let (alive, gone) = oneshot::channel::<()>();

        let producer = tokio::spawn(async move {
            let _alive = alive;
            let _emitter = emitter;
            std::future::pending::<()>().await;
        });

        let stream = stream.abort_on_drop(producer);
        drop(stream);

        let dropped = tokio::time::timeout(Duration::from_secs(1), gone).await;
        assert!(matches!(dropped, Ok(Err(_))));
    }
}
