//! Routing and middleware on top of the `fast-http` transport.
//!
//! A [`Dispatcher`] runs every request through a [`MiddlewareChain`]; when all
//! middlewares have called [`Next::proceed`], the request is matched against the
//! [`RouteTable`] and handed to the route's handlers, or to the not-found handler.
//!
//! ```no_run
//! use fast_web::{Dispatcher, MiddlewareChain, RouteTable, Server, handler_fn, middleware_fn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut routes = RouteTable::new();
//!     routes
//!         .get("/api/courses/:id?", handler_fn(|req, resp| resp.json(req.parsed())))
//!         .expect("valid route template");
//!
//!     let mut middlewares = MiddlewareChain::new();
//!     middlewares.add(middleware_fn(|_req, resp, next| {
//!         let _ = resp.write_header("x-powered-by", "fast-web");
//!         next.proceed();
//!     }));
//!
//!     Server::builder()
//!         .dispatcher(Dispatcher::new(routes, middlewares))
//!         .address("127.0.0.1:3000")
//!         .build()
//!         .expect("valid server config")
//!         .start()
//!         .await;
//! }
//! ```

mod dispatcher;
mod error;
mod handler;
mod middleware;
mod path;
mod request;
mod response;
mod router;
mod server;

#[cfg(test)]
mod test_util;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ResponseError, RouteError};
pub use handler::{FnHandler, IntoHandlers, RequestHandler, handler_fn};
pub use middleware::{FnMiddleware, IntoMiddlewares, Middleware, MiddlewareChain, Next, middleware_fn};
pub use path::{PathMatcher, normalize_path};
pub use request::{ParsedUrl, PathParams, RequestContext};
pub use response::{Chunk, ResponseContext};
pub use router::{DEFAULT_METHODS, NOT_FOUND_BODY, Route, RouteHandle, RouteTable};
pub use server::{Server, ServerBuildError, ServerBuilder};
