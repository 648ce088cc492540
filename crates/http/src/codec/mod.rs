//! Wire codecs for the connection loop.
//!
//! - [`RequestDecoder`]: bytes to [`RequestHeader`](crate::protocol::RequestHeader), skipping fixed-length bodies
//! - [`ResponseEncoder`]: a buffered `Response<Bytes>` to bytes
//!
//! # Example
//!
//! ```no_run
//! use fast_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let request = decoder.decode(&mut buffer);
//! ```

mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
