//! The seam between the connection loop and whatever answers requests.
//!
//! A [`Handler`] receives each decoded [`RequestHeader`] with its own
//! [`ResponseBuffer`]. The handler may end the buffer before returning or hand it
//! off to finish later; the connection waits for the buffer to be ended (or dropped)
//! before writing the response.

use std::error::Error;

use crate::protocol::{RequestHeader, ResponseBuffer};

pub trait Handler: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>> + Send;

    /// Starts handling one request.
    ///
    /// An `Err` means the request could not be handled; the connection answers with
    /// 500 unless the response was already ended.
    fn call(&self, request: RequestHeader, response: ResponseBuffer) -> Result<(), Self::Error>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F, Err> Handler for HandlerFn<F>
where
    F: Fn(RequestHeader, ResponseBuffer) -> Result<(), Err> + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>> + Send,
{
    type Error = Err;

    fn call(&self, request: RequestHeader, response: ResponseBuffer) -> Result<(), Self::Error> {
        (self.f)(request, response)
    }
}

pub fn make_handler<F, Err>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestHeader, ResponseBuffer) -> Result<(), Err>,
    Err: Into<Box<dyn Error + Send + Sync>> + Send,
{
    HandlerFn { f }
}
