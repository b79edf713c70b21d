//! Shared test doubles for pipeline tests.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::pipeline::{
    Body, BodyReader, DynSender, HttpClient, HttpError, HttpRequest, HttpResponse, transport,
};

/// Records what happened to one response body.
#[derive(Debug, Default)]
pub struct BodyTracker {
    closes: AtomicUsize,
}

impl BodyTracker {
    /// Number of times the reader's close ran.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closes() > 0
    }
}

/// A body reader that reports closes to a shared [`BodyTracker`].
#[derive(Debug)]
pub struct TrackedBody {
    content: Cursor<Vec<u8>>,
    tracker: Arc<BodyTracker>,
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.tracker.is_closed() {
            return Err(io::Error::other("read on closed tracked body"));
        }
        self.content.read(buf)
    }
}

impl BodyReader for TrackedBody {
    fn close(&mut self) -> io::Result<()> {
        self.tracker.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A body reader that yields some bytes, then fails.
#[derive(Debug)]
pub struct BrokenBody {
    content: Cursor<Vec<u8>>,
}

impl BrokenBody {
    pub fn after(content: &[u8]) -> Self {
        Self {
            content: Cursor::new(content.to_vec()),
        }
    }
}

impl Read for BrokenBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.content.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            n => Ok(n),
        }
    }
}

impl BodyReader for BrokenBody {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds a response whose body close is observable.
pub fn tracked_response(
    status: StatusCode,
    headers: HeaderMap,
    content: impl Into<Vec<u8>>,
) -> (HttpResponse, Arc<BodyTracker>) {
    let tracker = Arc::new(BodyTracker::default());
    let body = Body::new(TrackedBody {
        content: Cursor::new(content.into()),
        tracker: Arc::clone(&tracker),
    });
    (HttpResponse::new(status, headers, Some(body)), tracker)
}

/// One scripted reply of [`MockClient`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with this status, headers, and body
    Respond {
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    },
    /// Fail at the transport level
    Fail,
}

impl Reply {
    pub fn status(code: u16) -> Self {
        Self::Respond {
            status: StatusCode::from_u16(code).unwrap(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Self::Respond { headers, .. } = &mut self {
            headers.append(
                HeaderName::from_static(name),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        self
    }

    pub fn body(mut self, content: impl Into<Vec<u8>>) -> Self {
        if let Self::Respond { body, .. } = &mut self {
            *body = content.into();
        }
        self
    }
}

/// Transport double that plays a script of replies, then repeats a
/// fallback reply forever.
#[derive(Debug)]
pub struct MockClient {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    attempts: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    bodies: Mutex<Vec<Arc<BodyTracker>>>,
}

impl MockClient {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            attempts: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Trackers of every body handed out, in order.
    pub fn bodies(&self) -> Vec<Arc<BodyTracker>> {
        self.bodies.lock().unwrap().clone()
    }
}

impl HttpClient for MockClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Fail => Err(HttpError::Timeout),
            Reply::Respond {
                status,
                headers,
                body,
            } => {
                let (response, tracker) = tracked_response(status, headers, body);
                self.bodies.lock().unwrap().push(tracker);
                Ok(response)
            }
        }
    }
}

impl HttpClient for Arc<MockClient> {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        (**self).request(req).await
    }
}

/// Wraps a shared mock as a pipeline sender.
pub fn mock_sender(client: &Arc<MockClient>) -> DynSender {
    transport(Arc::clone(client))
}

pub fn test_url() -> url::Url {
    url::Url::parse("https://example.com/subscriptions/sub/jobs").unwrap()
}

pub fn test_request() -> HttpRequest {
    HttpRequest::get(test_url())
}
