//! In-memory [`Transport`] for tests: replies are queued up front and every request is recorded.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use futures::{StreamExt, stream};
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;

use crate::interface::{
    RequestBody, ResponseBody, Transport, TransportError, TransportRequest, TransportResponse, TransportResult,
};

/// A request as the transport saw it, with the body flattened to bytes.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub operation: &'static str,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

enum Reply {
    Response { status: u16, chunks: Vec<Result<Bytes, String>> },
    Failure(String),
}

/// Decrements the open body count when the body holding it is dropped.
struct BodyGuard(Arc<AtomicUsize>);

impl BodyGuard {
    fn new(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self(open.clone())
    }

    fn touch(&self) {}
}

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    open_bodies: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_bytes(status, Bytes::from(body.to_string()));
    }

    pub fn push_bytes(&self, status: u16, body: impl Into<Bytes>) {
        let body = body.into();
        let chunks = if body.is_empty() { vec![] } else { vec![Ok(body)] };
        self.push_chunks(status, chunks);
    }

    /// Queues a response whose body arrives in the given chunks; `Err` entries fail the body read.
    pub fn push_chunks(&self, status: u16, chunks: Vec<Result<Bytes, String>>) {
        self.replies.lock().push_back(Reply::Response { status, chunks });
    }

    /// Queues a failure before any response arrives, like a refused connection.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().push_back(Reply::Failure(message.into()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Replies still queued.
    pub fn pending(&self) -> usize {
        self.replies.lock().len()
    }

    /// Response bodies handed out and not yet dropped.
    pub fn open_bodies(&self) -> usize {
        self.open_bodies.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> TransportResult<TransportResponse> {
        let body = match request.body {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Binary { data, .. } => data,
        };
        self.requests.lock().push(RecordedRequest {
            operation: request.operation,
            method: request.method,
            path: request.path,
            headers: request.headers,
            body,
        });

        let reply = self.replies.lock().pop_front();
        match reply {
            None => Err(TransportError::msg(format!("no reply queued for {}", request.operation))),
            Some(Reply::Failure(message)) => Err(TransportError::msg(message)),
            Some(Reply::Response { status, chunks }) => {
                let guard = BodyGuard::new(&self.open_bodies);
                let body = stream::iter(chunks).map(move |chunk| {
                    guard.touch();
                    chunk.map_err(TransportError::msg)
                });
                Ok(TransportResponse {
                    status,
                    status_message: StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or_default()
                        .to_owned(),
                    body: ResponseBody::from_stream(body),
                })
            },
        }
    }
}
