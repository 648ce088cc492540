//! Drives one request through the middleware chain and into the route table.
//!
//! ```text
//! RECEIVED -> MIDDLEWARE_RUNNING -> ROUTING -> DONE          (chain completed)
//!                                -> FORCE_END -> DONE        (chain stopped early)
//! ```
//!
//! Whichever of routing and force-ending claims the request first wins; the other is
//! skipped, so every request reaches `DONE` exactly once.

use std::sync::{Arc, Mutex, PoisonError};

use fast_http::protocol::{RequestHeader, ResponseSink};
use http::StatusCode;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, RouteError};
use crate::middleware::MiddlewareChain;
use crate::request::RequestContext;
use crate::response::ResponseContext;
use crate::router::RouteTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    MiddlewareRunning,
    Routing,
    ForceEnd,
    Done,
}

/// Moves `stage` from `from` to `to`, returns false when it was not at `from`.
fn transition(stage: &Mutex<Stage>, from: Stage, to: Stage) -> bool {
    let mut current = stage.lock().unwrap_or_else(PoisonError::into_inner);
    if *current != from {
        return false;
    }
    *current = to;
    true
}

/// The configured routes and middlewares, shared read-only by every request.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    middlewares: Arc<MiddlewareChain>,
    protocol: Option<String>,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, middlewares: MiddlewareChain) -> Self {
        Self { routes: Arc::new(routes), middlewares: Arc::new(middlewares), protocol: None }
    }

    /// Declares the protocol relative request targets are resolved with, `http` by default.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn middlewares(&self) -> &MiddlewareChain {
        &self.middlewares
    }

    /// Dispatches one request, writing its answer through `sink`.
    ///
    /// The request line is logged at info once the middleware chain has completed.
    ///
    /// Fails before any middleware runs when the method is not allowed (the response
    /// is ended with 501) or the Host header or URL cannot be parsed (ended with 400).
    pub fn dispatch(&self, raw: RequestHeader, sink: impl ResponseSink + 'static) -> Result<(), DispatchError> {
        debug!(method = %raw.method(), uri = %raw.uri(), "dispatch request");
        let mut response = ResponseContext::new(sink);

        if !self.routes.supports(raw.method()) {
            warn!(method = %raw.method(), "method not supported");
            response.status(StatusCode::NOT_IMPLEMENTED).end();
            return Err(RouteError::method_not_supported(raw.method()).into());
        }

        let request = match RequestContext::with_protocol(raw, self.protocol.as_deref()) {
            Ok(request) => request,
            Err(e) => {
                warn!(cause = %e, "cannot parse request url");
                response.status(StatusCode::BAD_REQUEST).end();
                return Err(e);
            }
        };

        let stage = Arc::new(Mutex::new(Stage::MiddlewareRunning));
        let total = self.middlewares.len();

        let routes = Arc::clone(&self.routes);
        let routing_stage = Arc::clone(&stage);
        let on_complete = move |req: &mut RequestContext, resp: &mut ResponseContext| {
            if !transition(&routing_stage, Stage::MiddlewareRunning, Stage::Routing) {
                warn!("middleware chain completed after the response was force-ended, skip routing");
                return;
            }
            info!("{}: {}", req.method(), req.uri());
            routes.invoke(req, resp);
            transition(&routing_stage, Stage::Routing, Stage::Done);
        };

        let on_partial = |executed: usize, _req: &mut RequestContext, resp: &mut ResponseContext| {
            if !transition(&stage, Stage::MiddlewareRunning, Stage::ForceEnd) {
                return;
            }
            warn!(executed, total, "Only {executed}/{total} middleware(s) ran");
            if !resp.is_finished() {
                resp.end();
            }
            transition(&stage, Stage::ForceEnd, Stage::Done);
        };

        self.middlewares.run(request, response, on_complete, on_partial);
        Ok(())
    }
}
