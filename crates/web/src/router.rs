//! Per-method route registration and first-match lookup.
//!
//! # Example
//!
//! ```
//! use fast_web::{RouteTable, handler_fn};
//!
//! let mut routes = RouteTable::new();
//! routes.get("/api/courses/:id?", handler_fn(|req, resp| {
//!     match req.params().get("id") {
//!         Some(id) => resp.send(format!("course {id}")),
//!         None => resp.send("all courses"),
//!     }
//! })).unwrap();
//!
//! assert!(routes.find(&http::Method::GET, "/api/courses/3").is_some());
//! assert!(routes.find(&http::Method::POST, "/api/courses/3").is_none());
//! assert_eq!(routes.methods(), fast_web::DEFAULT_METHODS.as_slice());
//! assert_eq!(fast_web::NOT_FOUND_BODY, "404: Not found");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::{debug, warn};

use crate::error::RouteError;
use crate::handler::{IntoHandlers, RequestHandler};
use crate::path::PathMatcher;
use crate::request::RequestContext;
use crate::response::ResponseContext;

/// Body written by the default not-found fallback.
pub const NOT_FOUND_BODY: &str = "404: Not found";

/// Methods accepted by a table created with [`RouteTable::new`].
pub const DEFAULT_METHODS: [Method; 7] =
    [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS, Method::HEAD, Method::PATCH];

/// A registered route: its method, compiled template and handlers.
pub struct Route {
    method: Method,
    matcher: PathMatcher,
    handlers: Vec<Arc<dyn RequestHandler>>,
}

/// Shared handle to a registered route.
pub type RouteHandle = Arc<Route>;

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The template string exactly as registered.
    pub fn template(&self) -> &str {
        self.matcher.template()
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.test(path)
    }

    /// Invokes every handler in registration order.
    pub fn invoke(&self, req: &RequestContext, resp: &mut ResponseContext) {
        for handler in &self.handlers {
            handler.invoke(req, resp);
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

macro_rules! method_shorthands {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, template: &str, handlers: impl IntoHandlers) -> Result<RouteHandle, RouteError> {
                self.add($method, template, handlers)
            }
        )+
    };
}

/// Routes grouped by method, each group kept in registration order.
pub struct RouteTable {
    methods: Vec<Method>,
    routes: HashMap<Method, Vec<RouteHandle>>,
    not_found: Option<Arc<dyn RequestHandler>>,
}

impl RouteTable {
    /// A table accepting the seven common methods (GET, POST, PUT, DELETE, OPTIONS, HEAD, PATCH).
    pub fn new() -> Self {
        Self::with_methods(DEFAULT_METHODS)
    }

    /// A table accepting exactly `methods`.
    pub fn with_methods(methods: impl IntoIterator<Item = Method>) -> Self {
        let mut allowed = Vec::new();
        for method in methods {
            if !allowed.contains(&method) {
                allowed.push(method);
            }
        }
        Self { methods: allowed, routes: HashMap::new(), not_found: None }
    }

    /// A table accepting every method `http::Method` names, CONNECT and TRACE included.
    pub fn with_all_methods() -> Self {
        Self::with_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
            Method::PATCH,
            Method::CONNECT,
            Method::TRACE,
        ])
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn supports(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Registers `handlers` for `method` requests matching `template`.
    ///
    /// The method name is matched case-insensitively against the allowed methods.
    pub fn add(&mut self, method: impl AsRef<str>, template: &str, handlers: impl IntoHandlers) -> Result<RouteHandle, RouteError> {
        let name = method.as_ref().to_ascii_uppercase();
        let method = Method::from_bytes(name.as_bytes()).map_err(|_| RouteError::method_not_supported(&name))?;
        if !self.supports(&method) {
            return Err(RouteError::method_not_supported(name));
        }

        let handlers = handlers.into_handlers();
        if handlers.is_empty() {
            return Err(RouteError::missing_handler(template));
        }

        let matcher = PathMatcher::compile(template)?;
        let route = Arc::new(Route { method: method.clone(), matcher, handlers });

        debug!(method = %method, template, "route registered");
        self.routes.entry(method).or_default().push(Arc::clone(&route));
        Ok(route)
    }

    method_shorthands! {
        /// Registers a GET route.
        get => Method::GET;
        /// Registers a POST route.
        post => Method::POST;
        /// Registers a PUT route.
        put => Method::PUT;
        /// Registers a DELETE route.
        delete => Method::DELETE;
        /// Registers a PATCH route.
        patch => Method::PATCH;
        /// Registers a HEAD route.
        head => Method::HEAD;
        /// Registers an OPTIONS route.
        options => Method::OPTIONS;
    }

    /// Removes the first `method` route whose template equals `template` exactly.
    pub fn remove(&mut self, method: impl AsRef<str>, template: &str) -> bool {
        let name = method.as_ref().to_ascii_uppercase();
        let Ok(method) = Method::from_bytes(name.as_bytes()) else {
            return false;
        };
        let Some(routes) = self.routes.get_mut(&method) else {
            return false;
        };

        match routes.iter().position(|route| route.template() == template) {
            Some(index) => {
                routes.remove(index);
                debug!(method = %method, template, "route removed");
                true
            }
            None => false,
        }
    }

    /// The first route registered for `method` that matches `path`.
    pub fn find(&self, method: &Method, path: &str) -> Option<&RouteHandle> {
        self.routes.get(method)?.iter().find(|route| route.is_match(path))
    }

    /// Replaces the not-found fallback.
    pub fn set_not_found(&mut self, handler: impl RequestHandler + 'static) {
        self.not_found = Some(Arc::new(handler));
    }

    /// Routes the request: binds and runs the matching route, or the not-found fallback.
    ///
    /// Returns whether a route matched.
    pub fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> bool {
        match self.find(req.method(), req.pathname()) {
            Some(route) => {
                req.bind_route_path(route.matcher());
                route.invoke(req, resp);
                true
            }
            None => {
                self.handle_not_found(req, resp);
                false
            }
        }
    }

    fn handle_not_found(&self, req: &RequestContext, resp: &mut ResponseContext) {
        warn!(method = %req.method(), path = req.pathname(), "{NOT_FOUND_BODY}");
        resp.status(StatusCode::NOT_FOUND);

        match &self.not_found {
            Some(handler) => handler.invoke(req, resp),
            None => resp.end_with(NOT_FOUND_BODY),
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("methods", &self.methods)
            .field("routes", &self.routes)
            .field("not_found", &self.not_found.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::handler::handler_fn;
    use crate::test_util::{buffered, context};

    fn sender(body: &'static str) -> impl RequestHandler + 'static {
        handler_fn(move |_req, resp| resp.send(body))
    }

    fn route(routes: &RouteTable, method: Method, uri: &str) -> (bool, http::Response<Bytes>) {
        let mut req = context(method, uri);
        let (mut resp, mut receiver) = buffered();

        let matched = routes.invoke(&mut req, &mut resp);
        drop(resp);
        (matched, receiver.try_recv().unwrap())
    }

    #[test]
    fn first_match_wins() {
        let mut routes = RouteTable::new();
        routes.get("/users/:id", sender("by id")).unwrap();
        routes.get("/users/me", sender("me")).unwrap();

        let found = routes.find(&Method::GET, "/users/me").unwrap();
        assert_eq!(found.template(), "/users/:id");

        let (matched, response) = route(&routes, Method::GET, "/users/me");
        assert!(matched);
        assert_eq!(response.body(), &Bytes::from_static(b"by id"));
    }

    #[test]
    fn methods_are_separate() {
        let mut routes = RouteTable::new();
        routes.post("/api/courses", sender("created")).unwrap();

        assert!(routes.find(&Method::POST, "/api/courses").is_some());
        assert!(routes.find(&Method::GET, "/api/courses").is_none());
    }

    #[test]
    fn method_names_are_case_insensitive() {
        let mut routes = RouteTable::new();
        let handle = routes.add("patch", "/api/courses/:id", sender("patched")).unwrap();

        assert_eq!(handle.method(), &Method::PATCH);
        assert!(routes.find(&Method::PATCH, "/api/courses/1").is_some());
        assert!(routes.remove("Patch", "/api/courses/:id"));
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let mut routes = RouteTable::new();

        assert!(matches!(routes.add("TRACE", "/", sender("x")), Err(RouteError::MethodNotSupported { .. })));
        assert!(matches!(routes.add("NOT A METHOD", "/", sender("x")), Err(RouteError::MethodNotSupported { .. })));

        let mut all = RouteTable::with_all_methods();
        assert!(all.add("TRACE", "/", sender("x")).is_ok());
        assert!(all.supports(&Method::CONNECT));

        let mut custom = RouteTable::with_methods([Method::GET]);
        assert!(custom.get("/", sender("x")).is_ok());
        assert!(matches!(custom.post("/", sender("x")), Err(RouteError::MethodNotSupported { .. })));
    }

    #[test]
    fn empty_handler_list_is_rejected() {
        let mut routes = RouteTable::new();
        let handlers: Vec<Arc<dyn RequestHandler>> = Vec::new();

        assert!(matches!(routes.get("/", handlers), Err(RouteError::MissingHandler { .. })));
        assert!(routes.find(&Method::GET, "/").is_none());
    }

    #[test]
    fn invalid_template_is_rejected() {
        let mut routes = RouteTable::new();

        assert!(matches!(routes.get("/users/:", sender("x")), Err(RouteError::InvalidTemplate { .. })));
    }

    #[test]
    fn remove_falls_through_to_next_match() {
        let mut routes = RouteTable::new();
        routes.get("/users/:id", sender("by id")).unwrap();
        routes.get("/users/me", sender("me")).unwrap();

        assert!(!routes.remove("GET", "/users/:name"));
        assert!(!routes.remove("POST", "/users/:id"));
        assert!(routes.remove("GET", "/users/:id"));

        let (_, response) = route(&routes, Method::GET, "/users/me");
        assert_eq!(response.body(), &Bytes::from_static(b"me"));

        assert!(routes.remove("GET", "/users/me"));
        let (matched, response) = route(&routes, Method::GET, "/users/me");
        assert!(!matched);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn remove_only_first_duplicate() {
        let mut routes = RouteTable::new();
        routes.get("/dup", sender("first")).unwrap();
        routes.get("/dup", sender("second")).unwrap();

        assert!(routes.remove("GET", "/dup"));

        let (_, response) = route(&routes, Method::GET, "/dup");
        assert_eq!(response.body(), &Bytes::from_static(b"second"));
    }

    #[test]
    fn handlers_run_in_order_and_bind_params() {
        let mut routes = RouteTable::new();
        routes
            .get(
                "/a/:x/:y?",
                (
                    handler_fn(|req, resp| {
                        resp.write(format!("x={};", req.params().get("x").unwrap_or("-")));
                    }),
                    handler_fn(|req, resp| {
                        resp.write(format!("y={};", req.params().get("y").unwrap_or("-")));
                    }),
                    handler_fn(|req, resp| resp.send(req.route_path().unwrap_or_default().to_owned())),
                ),
            )
            .unwrap();

        let (_, response) = route(&routes, Method::GET, "/a/1");
        assert_eq!(response.body(), &Bytes::from_static(b"x=1;y=-;/a/:x/:y?"));

        let (_, response) = route(&routes, Method::GET, "/A/1/2/");
        assert_eq!(response.body(), &Bytes::from_static(b"x=1;y=2;/a/:x/:y?"));
    }

    #[test]
    fn default_not_found() {
        let routes = RouteTable::new();

        let (matched, response) = route(&routes, Method::GET, "/missing");

        assert!(!matched);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), &Bytes::from_static(b"404: Not found"));
    }

    #[test]
    fn custom_not_found_sees_404() {
        let mut routes = RouteTable::new();
        routes.set_not_found(handler_fn(|req, resp| {
            assert_eq!(resp.status_code(), Some(StatusCode::NOT_FOUND));
            assert_eq!(req.route_path(), None);
            resp.redirect_with(302, "/?redirected=true").unwrap();
        }));

        let (matched, response) = route(&routes, Method::GET, "/missing");

        assert!(!matched);
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(http::header::LOCATION).unwrap(), "/?redirected=true");
    }
}
