use std::fmt::{Debug, Formatter};

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use http::{HeaderMap, Method};
use thiserror::Error;

/// An I/O failure below the protocol layer: connection refused, timeout, a body cut off mid-read.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct TransportError(#[from] anyhow::Error);

impl TransportError {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        TransportError(anyhow::Error::new(e))
    }

    pub fn msg(message: impl std::fmt::Display + Debug + Send + Sync + 'static) -> Self {
        TransportError(anyhow::Error::msg(message))
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Body of an outgoing request.
#[derive(Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// A binary payload of known length.
    Binary { data: Bytes, size: u64 },
}

impl RequestBody {
    pub fn len(&self) -> u64 {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Binary { size, .. } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for RequestBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Binary { size, .. } => write!(f, "Binary({size} bytes)"),
        }
    }
}

/// Everything the transport needs to perform one exchange. `path` is already percent-encoded
/// and relative to the configured endpoint.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub operation: &'static str,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// A response body delivered as a stream of chunks.
///
/// Dropping the body releases the underlying connection whether or not it was read to the end.
pub struct ResponseBody {
    inner: BoxStream<'static, TransportResult<Bytes>>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if data.is_empty() {
            return Self::empty();
        }
        Self::from_stream(stream::iter([Ok(data)]))
    }

    pub fn from_stream<S>(s: S) -> Self
    where
        S: Stream<Item = TransportResult<Bytes>> + Send + 'static,
    {
        Self { inner: s.boxed() }
    }

    /// Next chunk of the body, or `None` once the body is exhausted.
    pub async fn chunk(&mut self) -> Option<TransportResult<Bytes>> {
        self.inner.next().await
    }

    /// Reads the whole body into memory.
    pub async fn bytes(mut self) -> TransportResult<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Debug for ResponseBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResponseBody { .. }")
    }
}

#[derive(Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub status_message: String,
    pub body: ResponseBody,
}

/// Performs a single request/response exchange against the bulk import API.
///
/// Implementations do not retry; failures are surfaced to the caller immediately.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> TransportResult<TransportResponse>;

    /// Best-effort extraction of a server-supplied error message from a non-200 body.
    fn error_detail(&self, body: &[u8]) -> Option<String> {
        default_error_detail(body)
    }
}

/// Longest error detail kept from a plain-text error body.
const MAX_ERROR_DETAIL_LEN: usize = 1024;

/// Uses the `message` (or `error`) string of a JSON object body, or failing that the trimmed
/// text of the body.
pub fn default_error_detail(body: &[u8]) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(s)) = map.get(key) {
                if !s.trim().is_empty() {
                    return Some(s.trim().to_owned());
                }
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_ERROR_DETAIL_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_json_message() {
        let body = br#"{"error":"NotFound","message":"Bulk import session 'sess01' does not exist","severity":"error"}"#;
        assert_eq!(
            default_error_detail(body).as_deref(),
            Some("Bulk import session 'sess01' does not exist")
        );

        let body = br#"{"error":"Session is frozen"}"#;
        assert_eq!(default_error_detail(body).as_deref(), Some("Session is frozen"));
    }

    #[test]
    fn test_error_detail_falls_back_to_text() {
        assert_eq!(default_error_detail(b"  upstream timeout\n").as_deref(), Some("upstream timeout"));
        assert_eq!(default_error_detail(b""), None);
        assert_eq!(default_error_detail(b"   "), None);

        let long = "x".repeat(5000);
        assert_eq!(default_error_detail(long.as_bytes()).unwrap().len(), MAX_ERROR_DETAIL_LEN);
    }

    #[tokio::test]
    async fn test_response_body_collects_chunks() {
        let body = ResponseBody::from_stream(stream::iter([Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))]));
        assert_eq!(body.bytes().await.unwrap(), Bytes::from_static(b"abcd"));

        assert!(ResponseBody::empty().bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_response_body_surfaces_stream_errors() {
        let body = ResponseBody::from_stream(stream::iter([
            Ok(Bytes::from_static(b"ab")),
            Err(TransportError::msg("connection reset")),
        ]));
        let err = body.bytes().await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
