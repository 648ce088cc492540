//! The raw request/response transport underneath `fast-web`.
//!
//! This crate accepts HTTP/1.1 connections, decodes request heads and hands each
//! request to a [`handler::Handler`] together with a [`protocol::ResponseBuffer`],
//! a response sink the handler fills in and terminates. Once the sink is ended the
//! buffered response is encoded back onto the connection.
//!
//! It deliberately knows nothing about routing: the sink contract
//! ([`protocol::ResponseSink`]) is what the routing layer builds on.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fast_http::connection::HttpConnection;
//! use fast_http::handler::make_handler;
//! use fast_http::protocol::{RequestHeader, ResponseBuffer, ResponseSink};
//! use tokio::net::TcpListener;
//! use tracing::{error, info};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = TcpListener::bind("127.0.0.1:8080").await.expect("bind failed");
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let Ok((tcp_stream, _remote_addr)) = tcp_listener.accept().await else { continue };
//!         let handler = handler.clone();
//!
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             match HttpConnection::new(reader, writer).process(handler).await {
//!                 Ok(()) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!("service has error, cause {}, connection shutdown", e),
//!             }
//!         });
//!     }
//! }
//!
//! fn hello_world(request: RequestHeader, mut response: ResponseBuffer) -> Result<(), std::io::Error> {
//!     info!("request path {}", request.uri().path());
//!     response.end(Some("Hello World!\r\n".into()));
//!     Ok(())
//! }
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.x only, no TLS
//! - request bodies are skipped, chunked request bodies are rejected
//! - maximum header size: 8KB, maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
