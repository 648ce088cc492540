//! Connection handling.
//!
//! [`HttpConnection`] drives one accepted stream: it decodes request heads, answers
//! `Expect: 100-continue`, passes each request to the [`Handler`](crate::handler::Handler)
//! and writes back the response once its buffer has been ended.

mod http_connection;

pub use http_connection::HttpConnection;
