//! Protocol types shared by the codec, the connection loop and the routing layer.
//!
//! - [`RequestHeader`]: the decoded request line and headers
//! - [`ResponseSink`]: the contract a response is written through
//! - [`ResponseBuffer`]: the buffering sink handed out by the connection
//! - [`HttpError`], [`ParseError`], [`SendError`]: transport errors

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseBuffer;
pub use response::ResponseSink;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
