//! The writable side of a request.
//!
//! [`ResponseSink`] is the minimal contract a response is produced through: a status,
//! header fields, any number of body chunks and exactly one end. [`ResponseBuffer`]
//! is the sink the connection hands out; it collects everything in memory and,
//! once ended, passes the finished `Response<Bytes>` back to the connection.

use std::mem;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A low-level response writer.
///
/// Implementations must tolerate calls after [`ResponseSink::end`] by ignoring them,
/// so a response can never be terminated twice.
pub trait ResponseSink: Send {
    fn set_status(&mut self, status: StatusCode);

    /// The status set so far, `None` when nothing was set yet.
    fn status(&self) -> Option<StatusCode>;

    /// Sets a header field, replacing any previous value with the same name.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Appends a chunk to the body.
    fn write(&mut self, chunk: Bytes);

    /// Terminates the response, appending `chunk` first when given.
    fn end(&mut self, chunk: Option<Bytes>);

    fn is_finished(&self) -> bool;
}

/// An in-memory [`ResponseSink`] whose finished response is delivered through a oneshot channel.
///
/// A buffer dropped before it was ended is flushed as-is, so the peer is never left
/// waiting on a request nobody answered.
#[derive(Debug)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    sender: Option<oneshot::Sender<Response<Bytes>>>,
}

impl ResponseBuffer {
    /// Creates a buffer and the receiver its finished response will be sent to.
    pub fn channel() -> (Self, oneshot::Receiver<Response<Bytes>>) {
        let (sender, receiver) = oneshot::channel();
        let buffer = Self { status: None, headers: HeaderMap::new(), body: BytesMut::new(), sender: Some(sender) };
        (buffer, receiver)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn finish(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };

        let mut response = Response::new(mem::take(&mut self.body).freeze());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = mem::take(&mut self.headers);

        if sender.send(response).is_err() {
            debug!("response receiver has gone, drop the finished response");
        }
    }
}

impl ResponseSink for ResponseBuffer {
    fn set_status(&mut self, status: StatusCode) {
        if self.is_finished() {
            warn!(%status, "response already finished, ignore status");
            return;
        }
        self.status = Some(status);
    }

    fn status(&self) -> Option<StatusCode> {
        self.status
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.is_finished() {
            warn!(header = %name, "response already finished, ignore header");
            return;
        }
        self.headers.insert(name, value);
    }

    fn write(&mut self, chunk: Bytes) {
        if self.is_finished() {
            warn!(size = chunk.len(), "response already finished, ignore body chunk");
            return;
        }
        self.body.extend_from_slice(&chunk);
    }

    fn end(&mut self, chunk: Option<Bytes>) {
        if self.is_finished() {
            warn!("response already finished, ignore end");
            return;
        }
        if let Some(chunk) = chunk {
            self.body.extend_from_slice(&chunk);
        }
        self.finish();
    }

    fn is_finished(&self) -> bool {
        self.sender.is_none()
    }
}

impl Drop for ResponseBuffer {
    fn drop(&mut self) {
        if !self.is_finished() {
            warn!("response dropped without being ended, flush it as-is");
            self.finish();
        }
    }
}
