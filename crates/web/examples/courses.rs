//! A small course catalogue.
//!
//! ```text
//! curl -v http://127.0.0.1:3000/
//! curl -v http://127.0.0.1:3000/api/courses
//! curl -v "http://127.0.0.1:3000/api/courses/2?verbose=true"
//! curl -v http://127.0.0.1:3000/nowhere
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use fast_web::{Dispatcher, MiddlewareChain, RequestContext, ResponseContext, RouteTable, Server, handler_fn, middleware_fn};
use tracing::info;

fn welcome(_req: &RequestContext, resp: &mut ResponseContext) {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
    resp.send(format!("Welcome on Fast Http Server v0.1!\nUnix time: {now}"));
}

fn courses(req: &RequestContext, resp: &mut ResponseContext) {
    if req.params().get("id").is_some() {
        resp.json(req.parsed());
        return;
    }

    resp.write("<h1>Available courses</h1>");
    for i in 1..=4 {
        resp.write(format!("<li>Course #{i}</li>"));
    }
    resp.send("</ul>");
}

#[tokio::main]
async fn main() {
    let mut routes = RouteTable::new();
    routes.get("/", handler_fn(welcome)).unwrap();
    routes.get("/api/courses/:id?", handler_fn(courses)).unwrap();
    routes.set_not_found(handler_fn(|_req, resp| {
        if let Err(e) = resp.redirect_with(302, "/?redirected=true") {
            info!(cause = %e, "cannot redirect");
        }
    }));

    let mut middlewares = MiddlewareChain::new();
    middlewares.add(middleware_fn(|req, resp, next| {
        info!(path = req.pathname(), "serving");
        let _ = resp.write_header("x-powered-by", "fast-web");
        next.proceed();
    }));

    Server::builder()
        .dispatcher(Dispatcher::new(routes, middlewares))
        .address("127.0.0.1:3000")
        .build()
        .unwrap()
        .start()
        .await;
}
