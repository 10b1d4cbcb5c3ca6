use bytes::{Buf, Bytes};

/// A frame travelling through the codecs: either a message head or a piece of payload.
///
/// `T` is the head type (request header on the read side, response head on the write side),
/// `Data` the payload buffer type.
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    /// The request or response head
    Header(T),
    /// A chunk of payload data or the end marker
    Payload(PayloadItem<Data>),
}

/// One item of a payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// How a payload is framed on the wire.
///
/// Requests only ever use `Length` or `Empty`: chunked transfer coding is not accepted.
/// Responses whose length is unknown up front (server-sent events) use `UntilClose`:
/// no length header is written and the end of the body is signalled by closing the
/// connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload delimited by connection close
    UntilClose,
    /// Empty payload (no body)
    Empty,
    /// Answer to a `HEAD` request: the length the body would have had is announced when
    /// known, and no payload bytes follow
    HeadOnly(Option<u64>),
}

impl PayloadSize {
    #[inline]
    pub fn new_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// Returns true if no payload bytes are written after the head
    #[inline]
    pub fn is_head_only(&self) -> bool {
        matches!(self, PayloadSize::HeadOnly(_))
    }

    /// Returns true if the connection must be closed once the payload is written
    #[inline]
    pub fn is_close_delimited(&self) -> bool {
        matches!(self, PayloadSize::UntilClose)
    }
}

impl<T> Message<T> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the item and returns the contained bytes if this is a Chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_empty() {
        assert_eq!(PayloadSize::new_length(0), PayloadSize::Empty);
        assert_eq!(PayloadSize::new_length(12), PayloadSize::Length(12));
        assert!(PayloadSize::UntilClose.is_close_delimited());
        assert!(!PayloadSize::Length(3).is_close_delimited());
        assert!(PayloadSize::HeadOnly(Some(3)).is_head_only());
        assert!(!PayloadSize::HeadOnly(None).is_close_delimited());
    }

    #[test]
    fn message_from_bytes_is_payload() {
        let message: Message<()> = Bytes::from_static(b"abc").into();
        assert!(message.is_payload());
        assert!(!message.is_header());
    }
}
