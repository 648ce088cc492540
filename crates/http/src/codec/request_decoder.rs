//! Streaming decoder that turns raw bytes into [`RequestHeader`]s.
//!
//! Only the request head is surfaced. A `Content-Length` body is consumed and
//! discarded so that the next request on a keep-alive connection starts at the
//! right offset; chunked request bodies are rejected.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes request heads, skipping any fixed-length body that follows them.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    skip_remaining: u64,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops up to `skip_remaining` body bytes from `src`, returns true once the body is gone.
    fn skip_body(&mut self, src: &mut BytesMut) -> bool {
        if self.skip_remaining == 0 {
            return true;
        }

        let skipped = usize::try_from(self.skip_remaining).map_or(src.len(), |remaining| remaining.min(src.len()));
        src.advance(skipped);
        self.skip_remaining -= skipped as u64;

        trace!(skipped, remaining = self.skip_remaining, "skipped request body bytes");
        self.skip_remaining == 0
    }
}

impl Decoder for RequestDecoder {
    type Item = RequestHeader;
    type Error = ParseError;

    /// Returns `Ok(None)` while the head (or the body of the previous request) is incomplete.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !self.skip_body(src) || src.is_empty() {
            return Ok(None);
        }

        let Some((header, body_offset)) = parse_head(src)? else {
            ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
            return Ok(None);
        };

        trace!(head_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        src.advance(body_offset);
        self.skip_remaining = body_length(&header)?;
        self.skip_body(src);

        Ok(Some(header))
    }
}

/// Parses a complete request head, returning it together with the offset where the body starts.
fn parse_head(src: &[u8]) -> Result<Option<(RequestHeader, usize)>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut req = httparse::Request::new(&mut headers);

    let status = req.parse(src).map_err(|e| match e {
        Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        e => ParseError::invalid_header(e),
    })?;

    let Status::Complete(body_offset) = status else {
        return Ok(None);
    };

    let version = match req.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        // HTTP/2 and HTTP/3 are not supported
        _ => return Err(ParseError::InvalidVersion(req.version)),
    };

    let method = req.method.ok_or(ParseError::InvalidMethod)?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
    let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;

    let header_map = request.headers_mut();
    header_map.reserve(req.headers.len());
    for header in req.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
        header_map.append(name, value);
    }

    Ok(Some((RequestHeader::from(request), body_offset)))
}

/// Works out how many body bytes follow the head, per RFC 9112 section 6.
fn body_length(header: &RequestHeader) -> Result<u64, ParseError> {
    if !header.need_body() {
        return Ok(0);
    }

    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(0),

        (te_value @ Some(_), None) => {
            if is_chunked(te_value) {
                Err(ParseError::invalid_body("chunked request body is not supported"))
            } else {
                Ok(0)
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}

/// Whether chunked is the final transfer coding.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii() == CHUNKED;
        }
    }
    false
}
