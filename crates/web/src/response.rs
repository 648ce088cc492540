//! Response-side state of one dispatch.
//!
//! [`ResponseContext`] wraps the transport's [`ResponseSink`] with chainable status and
//! header setters, body helpers and an idempotent end. Once the response is finished
//! every further operation is ignored.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use fast_http::protocol::ResponseSink;
use http::{HeaderName, HeaderValue, StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::ResponseError;

/// A piece of response body.
///
/// Text and bytes are written as-is. JSON values are encoded, except that a JSON
/// string is written without quotes and `null` contributes nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Bytes(Bytes),
    Json(Value),
}

impl Chunk {
    pub fn into_bytes(self) -> Bytes {
        match self {
            Chunk::Bytes(bytes) => bytes,
            Chunk::Json(Value::Null) => Bytes::new(),
            Chunk::Json(Value::String(text)) => Bytes::from(text),
            Chunk::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

impl From<&str> for Chunk {
    fn from(value: &str) -> Self {
        Chunk::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Chunk {
    fn from(value: String) -> Self {
        Chunk::Bytes(Bytes::from(value))
    }
}

impl From<&String> for Chunk {
    fn from(value: &String) -> Self {
        Chunk::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<Bytes> for Chunk {
    fn from(value: Bytes) -> Self {
        Chunk::Bytes(value)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(value: Vec<u8>) -> Self {
        Chunk::Bytes(Bytes::from(value))
    }
}

impl From<Value> for Chunk {
    fn from(value: Value) -> Self {
        Chunk::Json(value)
    }
}

/// The writable side of one in-flight request.
pub struct ResponseContext {
    sink: Box<dyn ResponseSink>,
    finished: bool,
}

impl ResponseContext {
    pub fn new(sink: impl ResponseSink + 'static) -> Self {
        Self { sink: Box::new(sink), finished: false }
    }

    /// The raw sink underneath.
    pub fn low(&mut self) -> &mut dyn ResponseSink {
        self.sink.as_mut()
    }

    pub fn is_finished(&self) -> bool {
        self.finished || self.sink.is_finished()
    }

    /// The status set so far, `None` when nothing was set yet.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.sink.status()
    }

    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        if self.ignore_finished("status") {
            return self;
        }
        self.sink.set_status(code);
        self
    }

    /// Sets a header field, replacing any previous value with the same name.
    pub fn write_header<K, V>(&mut self, name: K, value: V) -> Result<&mut Self, ResponseError>
    where
        K: TryInto<HeaderName>,
        K::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        let name = name.try_into().map_err(|e| ResponseError::invalid_header(Into::<http::Error>::into(e)))?;
        let value = value.try_into().map_err(|e| ResponseError::invalid_header(Into::<http::Error>::into(e)))?;

        if !self.ignore_finished("write_header") {
            self.sink.set_header(name, value);
        }
        Ok(self)
    }

    /// Appends a body chunk without ending the response.
    pub fn write(&mut self, chunk: impl Into<Chunk>) -> &mut Self {
        if self.ignore_finished("write") {
            return self;
        }
        self.sink.write(chunk.into().into_bytes());
        self
    }

    /// Ends the response with `value` encoded as JSON; `null` is sent as `{}`.
    ///
    /// A value that fails to serialize is logged and sent as its `Debug` rendering.
    pub fn json<T: Serialize + fmt::Debug + ?Sized>(&mut self, value: &T) {
        if self.ignore_finished("json") {
            return;
        }

        match serde_json::to_vec(value) {
            Ok(body) => {
                let body = if body == b"null" { Bytes::from_static(b"{}") } else { Bytes::from(body) };
                self.sink.set_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.finish(Some(body));
            }
            Err(e) => {
                error!(cause = %e, "cannot convert value to json, send it as is");
                self.finish(Some(Bytes::from(format!("{value:?}"))));
            }
        }
    }

    /// Ends the response with `chunk` as the last piece of body.
    pub fn send(&mut self, chunk: impl Into<Chunk>) {
        self.end_with(chunk);
    }

    /// Sets `code` and sends its decimal representation as the body.
    pub fn send_status(&mut self, code: StatusCode) {
        self.status(code).send(code.as_str().to_owned());
    }

    /// Ends the response; later calls are no-ops.
    pub fn end(&mut self) {
        if self.ignore_finished("end") {
            return;
        }
        self.finish(None);
    }

    pub fn end_with(&mut self, chunk: impl Into<Chunk>) {
        if self.ignore_finished("end") {
            return;
        }
        let body = chunk.into().into_bytes();
        self.finish(if body.is_empty() { None } else { Some(body) });
    }

    /// Redirects to `path` with 302 Found.
    pub fn redirect(&mut self, path: &str) -> Result<(), ResponseError> {
        self.redirect_with(StatusCode::FOUND.as_u16(), path)
    }

    /// Redirects to `path` with `code`, which must be a 3xx status.
    pub fn redirect_with(&mut self, code: u16, path: &str) -> Result<(), ResponseError> {
        if !(300..=399).contains(&code) {
            return Err(ResponseError::BadStatusRange { code });
        }
        if path.is_empty() {
            return Err(ResponseError::bad_arguments("redirect path must not be empty"));
        }

        let status = StatusCode::from_u16(code).map_err(ResponseError::bad_arguments)?;
        let location = HeaderValue::from_str(path).map_err(ResponseError::bad_arguments)?;

        if self.ignore_finished("redirect") {
            return Ok(());
        }
        self.sink.set_status(status);
        self.sink.set_header(header::LOCATION, location);
        self.finish(None);
        Ok(())
    }

    pub fn jsonp<T: Serialize + ?Sized>(&mut self, _value: &T) -> Result<(), ResponseError> {
        Err(ResponseError::not_implemented("jsonp"))
    }

    pub fn send_file(&mut self, _path: impl AsRef<Path>) -> Result<(), ResponseError> {
        Err(ResponseError::not_implemented("send_file"))
    }

    pub fn download(&mut self, _path: impl AsRef<Path>, _filename: &str) -> Result<(), ResponseError> {
        Err(ResponseError::not_implemented("download"))
    }

    pub fn render<T: Serialize + ?Sized>(&mut self, _view: &str, _context: &T) -> Result<(), ResponseError> {
        Err(ResponseError::not_implemented("render"))
    }

    fn finish(&mut self, body: Option<Bytes>) {
        self.finished = true;
        self.sink.end(body);
    }

    fn ignore_finished(&self, operation: &'static str) -> bool {
        let finished = self.is_finished();
        if finished {
            warn!(operation, "response already finished, ignore operation");
        }
        finished
    }
}

impl fmt::Debug for ResponseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseContext")
            .field("status", &self.sink.status())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}
