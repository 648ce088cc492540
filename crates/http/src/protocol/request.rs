//! The decoded head of an incoming request.
//!
//! Request bodies are not surfaced to handlers, so a request is fully described by
//! its request line and header fields. [`RequestHeader`] wraps `http::Request<()>`
//! and is what the routing layer reads method, target and `Host` from.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version, header};

/// The method, target, version and header fields of one request.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// The request target exactly as it appeared on the request line.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// The `Host` header value, when present and valid visible ASCII.
    pub fn host(&self) -> Option<&str> {
        self.headers().get(header::HOST).and_then(|value| value.to_str().ok())
    }

    /// Whether a request with this method may carry a body that has to be consumed.
    ///
    /// Returns false for GET, HEAD, DELETE, OPTIONS and CONNECT.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
