use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::EXPECT;
use http::{Response, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, RequestHeader, ResponseBuffer, SendError};

/// One keep-alive connection: decode a request, let the handler answer it, write the answer, repeat.
///
/// Requests on a connection are answered strictly in order; the next request is not
/// decoded before the previous response has been written.
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    /// Serves requests until the peer closes the connection or sends something unparsable.
    pub async fn process<H: Handler>(mut self, handler: Arc<H>) -> Result<(), HttpError> {
        loop {
            match self.framed_read.next().await {
                Some(Ok(header)) => {
                    self.do_process(header, &handler).await?;
                }

                Some(Err(e)) => {
                    error!("can't receive next request, cause {}", e);
                    self.send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H: Handler>(&mut self, header: RequestHeader, handler: &Arc<H>) -> Result<(), HttpError> {
        // Check if the request header contains the "Expect: 100-continue" field.
        if let Some(value) = header.headers().get(EXPECT) {
            let slice = value.as_bytes();
            if slice.len() >= 4 && &slice[0..4] == b"100-" {
                let writer = self.framed_write.get_mut();
                writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::from)?;
                writer.flush().await.map_err(SendError::from)?;
                info!("receive expect request header, sent continue response");
            }
        }

        let (buffer, mut receiver) = ResponseBuffer::channel();

        let response = match handler.call(header, buffer) {
            Ok(()) => receiver.await.unwrap_or_else(|_| {
                error!("response buffer vanished before it was ended");
                build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }),
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!("handle request error, cause: {}", e);
                // an already ended response still goes out as written
                receiver.try_recv().unwrap_or_else(|_| build_error_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        };

        self.send_response(response).await
    }

    async fn send_response(&mut self, response: Response<Bytes>) -> Result<(), HttpError> {
        self.framed_write.send(response).await?;
        Ok(())
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status_code;
    response
}
