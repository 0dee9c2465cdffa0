//! Mock implementations for testing.
//!
//! Provides a scripted transport for driving sessions without a server:
//! bodies are lists of chunks, delays and read errors, optionally left open
//! forever, and every dropped body is counted so tests can assert the
//! connection was closed.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use crate::transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, StreamingResponse, TransportError,
};

/// One step of a scripted body.
#[derive(Debug, Clone)]
pub enum MockChunk {
    /// Bytes delivered as one read.
    Data(Bytes),
    /// Wait before the next step.
    Delay(Duration),
    /// Read failure.
    Error(String),
}

/// A scripted streaming response.
#[derive(Debug, Clone)]
pub struct MockStream {
    /// HTTP status code.
    pub status: u16,
    /// Body steps, in order.
    pub chunks: Vec<MockChunk>,
    /// Keep the body open after the last step.
    pub hang: bool,
    /// Fail to connect with this message instead of responding.
    pub connect_error: Option<String>,
    /// Never finish connecting.
    pub hang_on_connect: bool,
}

impl MockStream {
    /// A 200 response whose body is `chunks`, one read each.
    pub fn chunks<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Self {
            status: 200,
            chunks: chunks
                .into_iter()
                .map(|c| MockChunk::Data(c.into()))
                .collect(),
            hang: false,
            connect_error: None,
            hang_on_connect: false,
        }
    }

    /// A 200 response whose body never produces a chunk.
    pub fn silent() -> Self {
        Self::chunks(Vec::<Bytes>::new()).hanging()
    }

    /// A response with the given status and an empty body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::chunks(Vec::<Bytes>::new())
        }
    }

    /// A connection failure.
    pub fn connect_error(message: impl Into<String>) -> Self {
        Self {
            connect_error: Some(message.into()),
            ..Self::chunks(Vec::<Bytes>::new())
        }
    }

    /// A connect attempt that never completes.
    pub fn never_connects() -> Self {
        Self {
            hang_on_connect: true,
            ..Self::chunks(Vec::<Bytes>::new())
        }
    }

    /// Appends a data chunk.
    #[must_use]
    pub fn then_data(mut self, data: impl Into<Bytes>) -> Self {
        self.chunks.push(MockChunk::Data(data.into()));
        self
    }

    /// Appends a delay.
    #[must_use]
    pub fn then_delay(mut self, delay: Duration) -> Self {
        self.chunks.push(MockChunk::Delay(delay));
        self
    }

    /// Appends a read failure.
    #[must_use]
    pub fn then_error(mut self, message: impl Into<String>) -> Self {
        self.chunks.push(MockChunk::Error(message.into()));
        self
    }

    /// Keeps the body open after the last step.
    #[must_use]
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path.
    pub path: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

pin_project! {
    struct TrackedBody<S> {
        #[pin]
        inner: S,
        closed: Arc<AtomicUsize>,
    }

    impl<S> PinnedDrop for TrackedBody<S> {
        fn drop(this: Pin<&mut Self>) {
            this.project().closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl<S: Stream> Stream for TrackedBody<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock HTTP transport for testing.
#[derive(Default)]
pub struct MockTransport {
    streams: Mutex<VecDeque<MockStream>>,
    responses: Mutex<VecDeque<u16>>,
    requests: Mutex<Vec<RecordedRequest>>,
    closed_bodies: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a streaming response.
    pub fn queue_stream(&self, stream: MockStream) {
        lock(&self.streams).push_back(stream);
    }

    /// Queues the status of a plain response.
    pub fn queue_status(&self, status: u16) {
        lock(&self.responses).push_back(status);
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Number of streaming bodies dropped so far.
    pub fn closed_bodies(&self) -> usize {
        self.closed_bodies.load(Ordering::SeqCst)
    }

    fn record_request(&self, request: &HttpRequest) {
        lock(&self.requests).push(RecordedRequest {
            method: request.method,
            path: request.path.clone(),
            headers: request.headers.clone(),
        });
    }
}

fn scripted_body(
    steps: Vec<MockChunk>,
    hang: bool,
) -> impl Stream<Item = Result<Bytes, TransportError>> + Send {
    futures::stream::unfold(VecDeque::from(steps), move |mut queue| async move {
        loop {
            match queue.pop_front() {
                Some(MockChunk::Data(bytes)) => return Some((Ok(bytes), queue)),
                Some(MockChunk::Error(message)) => {
                    return Some((Err(TransportError::InvalidResponse { message }), queue));
                }
                Some(MockChunk::Delay(delay)) => tokio::time::sleep(delay).await,
                None if hang => std::future::pending::<()>().await,
                None => return None,
            }
        }
    })
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.record_request(&request);
        let status = lock(&self.responses).pop_front().unwrap_or(500);
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        })
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> Result<StreamingResponse, TransportError> {
        self.record_request(&request);

        let script = lock(&self.streams)
            .pop_front()
            .unwrap_or_else(|| MockStream::status(500));

        if script.hang_on_connect {
            std::future::pending::<()>().await;
        }
        if let Some(message) = script.connect_error {
            return Err(TransportError::Connection { message });
        }

        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/event-stream".to_string());

        let body = TrackedBody {
            inner: scripted_body(script.chunks, script.hang),
            closed: Arc::clone(&self.closed_bodies),
        };

        Ok(StreamingResponse {
            status: script.status,
            headers,
            stream: Box::pin(body),
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("request_count", &self.request_count())
            .field("closed_bodies", &self.closed_bodies())
            .finish()
    }
}
