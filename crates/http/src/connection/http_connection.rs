use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::{Method, Response, StatusCode, header};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::{BoxError, Handler};
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, PeerAddr, RequestHeader, ResponseHead, SendError};

/// Upper bound for the buffer reserved up front for a request body
const MAX_BODY_PREALLOCATE: u64 = 64 * 1024;

/// An HTTP/1.1 connection that reads requests, calls the handler and writes responses.
///
/// Each request body is collected (at most `Content-Length` bytes) before the handler
/// runs. The response body is written frame by frame, and every frame is flushed so
/// long-lived responses such as server-sent events reach the client as they are produced.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    peer_addr: Option<SocketAddr>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            peer_addr: None,
        }
    }

    /// Refuses request bodies whose declared length exceeds `max_body_size` with a 413.
    #[must_use]
    pub fn max_body_size(mut self, max_body_size: u64) -> Self {
        *self.framed_read.decoder_mut() = RequestDecoder::with_max_body_size(max_body_size);
        self
    }

    /// Records the remote address, exposed to handlers as a [`PeerAddr`] request extension.
    #[must_use]
    pub fn peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    let keep_alive = header.keep_alive();
                    let sent = self.do_process(header, payload_size, handler.as_ref()).await?;

                    if !keep_alive || sent.is_close_delimited() {
                        debug!(keep_alive, "response complete, closing connection");
                        self.framed_write.get_mut().shutdown().await.map_err(SendError::io)?;
                        return Ok(());
                    }
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("receive payload while waiting for a request header");
                    self.do_send_response(build_error_response(StatusCode::BAD_REQUEST), false).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    self.do_send_response(build_error_response(e.status_code()), false).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, header: RequestHeader, payload_size: PayloadSize, handler: &H) -> Result<PayloadSize, HttpError>
    where
        H: Handler,
        H::RespBody: Body + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        if header.expects_continue() && !payload_size.is_empty() {
            let writer = self.framed_write.get_mut();
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            debug!("receive expect request header, sent continue response");
        }

        let body = self.read_body(payload_size).await?;
        let head_request = header.method() == Method::HEAD;

        let mut request = header.body(body);
        if let Some(peer_addr) = self.peer_addr {
            request.extensions_mut().insert(PeerAddr(peer_addr));
        }

        let response_result = handler.call(request).await;
        self.send_response(response_result, head_request).await
    }

    /// Collects the request body up to the `Eof` the decoder emits after `Content-Length`
    /// bytes. Bodyless requests complete without touching the socket.
    async fn read_body(&mut self, payload_size: PayloadSize) -> Result<Bytes, ParseError> {
        let capacity = match payload_size {
            PayloadSize::Length(length) => usize::try_from(length.min(MAX_BODY_PREALLOCATE)).unwrap_or(0),
            PayloadSize::Empty | PayloadSize::UntilClose | PayloadSize::HeadOnly(_) => 0,
        };
        let mut body = BytesMut::with_capacity(capacity);

        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => body.extend_from_slice(&bytes),
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(body.freeze()),
                Some(Ok(Message::Header(_))) => return Err(ParseError::invalid_body("receive request header while reading body")),
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::invalid_body("connection closed before the body was complete")),
            }
        }
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>, head_request: bool) -> Result<PayloadSize, HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
        E: Into<BoxError>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response, head_request).await,
            Err(e) => {
                let e: BoxError = e.into();
                error!(cause = %e, "handle response error");
                self.do_send_response(build_error_response(StatusCode::INTERNAL_SERVER_ERROR), head_request).await
            }
        }
    }

    /// Writes `response`. For a `HEAD` request only the head goes out: `Content-Length`
    /// announces the size the body would have had and the body itself is dropped unread.
    async fn do_send_response<T>(&mut self, response: Response<T>, head_request: bool) -> Result<PayloadSize, HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let (header_parts, mut body) = response.into_parts();

        let payload_size = match body.size_hint().exact() {
            length if head_request => PayloadSize::HeadOnly(length.or_else(|| announced_length(&header_parts))),
            Some(0) => PayloadSize::Empty,
            Some(length) => PayloadSize::Length(length),
            None => PayloadSize::UntilClose,
        };

        let header = Message::<_, T::Data>::Header((ResponseHead::from_parts(header_parts, ()), payload_size));
        if payload_size.is_empty() {
            // nothing follows the head, flush it right away
            self.framed_write.send(header).await?;
        } else {
            self.framed_write.feed(header).await?;
        }

        if payload_size.is_head_only() {
            drop(body);
            self.framed_write
                .send(Message::Payload(PayloadItem::<T::Data>::Eof))
                .await
                .map_err(|e| SendError::invalid_body(format!("can't send head response: {e}")))?;
            return Ok(payload_size);
        }

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let Ok(data) = frame.into_data() else {
                        // trailers can't be expressed without chunked coding
                        continue;
                    };

                    self.framed_write
                        .send(Message::Payload(PayloadItem::Chunk(data)))
                        .await
                        .map_err(|e| SendError::invalid_body(format!("can't send response: {e}")))?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    self.framed_write
                        .send(Message::Payload(PayloadItem::<T::Data>::Eof))
                        .await
                        .map_err(|e| SendError::invalid_body(format!("can't send eof response: {e}")))?;
                    return Ok(payload_size);
                }
            }
        }
    }
}

fn announced_length(parts: &http::response::Parts) -> Option<u64> {
    parts.headers.get(header::CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::<Bytes>::new());
    *response.status_mut() = status_code;
    response
}
