use bytes::Bytes;
use fast_http::protocol::{RequestHeader, ResponseBuffer, ResponseSink};
use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode, header};
use mockall::mock;
use tokio::sync::oneshot;

use crate::request::RequestContext;
use crate::response::ResponseContext;

mock! {
    pub Sink {}

    impl ResponseSink for Sink {
        fn set_status(&mut self, status: StatusCode);
        fn status(&self) -> Option<StatusCode>;
        fn set_header(&mut self, name: HeaderName, value: HeaderValue);
        fn write(&mut self, chunk: Bytes);
        fn end(&mut self, chunk: Option<Bytes>);
        fn is_finished(&self) -> bool;
    }
}

pub fn request(method: Method, uri: &str, host: Option<&str>) -> RequestHeader {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(host) = host {
        builder = builder.header(header::HOST, host);
    }
    RequestHeader::from(builder.body(()).unwrap())
}

pub fn context(method: Method, uri: &str) -> RequestContext {
    RequestContext::new(request(method, uri, None)).unwrap()
}

pub fn buffered() -> (ResponseContext, oneshot::Receiver<Response<Bytes>>) {
    let (buffer, receiver) = ResponseBuffer::channel();
    (ResponseContext::new(buffer), receiver)
}
