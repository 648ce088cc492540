//! Ordered middleware with explicit continuation control.
//!
//! Each [`Middleware`] receives the request, the response and a [`Next`]. It either
//! calls [`Next::proceed`] (right away or later, from any thread) to hand over to the
//! following middleware, or ends the response and drops the `Next` to stop the chain.
//!
//! A run keeps one cursor: the number of middlewares entered so far. `proceed`
//! consumes its `Next`, so a middleware can advance the cursor at most once.
//! Continuations invoked while a middleware is still on the stack are queued and
//! picked up as soon as it returns, so a long chain never grows the stack.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::request::RequestContext;
use crate::response::ResponseContext;

pub trait Middleware: Send + Sync {
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseContext, next: Next);
}

/// a plain `Fn` holder which represents a middleware
pub struct FnMiddleware<F> {
    f: F,
}

pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext, Next) + Send + Sync,
{
    FnMiddleware { f }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext, Next) + Send + Sync,
{
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseContext, next: Next) {
        (self.f)(req, resp, next);
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}

/// One middleware or an ordered sequence of them.
pub trait IntoMiddlewares {
    fn into_middlewares(self) -> Vec<Arc<dyn Middleware>>;
}

impl<M: Middleware + 'static> IntoMiddlewares for M {
    fn into_middlewares(self) -> Vec<Arc<dyn Middleware>> {
        vec![Arc::new(self)]
    }
}

impl IntoMiddlewares for Vec<Arc<dyn Middleware>> {
    fn into_middlewares(self) -> Vec<Arc<dyn Middleware>> {
        self
    }
}

macro_rules! impl_into_middlewares_for_tuple {
    ($($middleware:ident),+) => {
        impl<$($middleware),+> IntoMiddlewares for ($($middleware,)+)
        where
            $($middleware: Middleware + 'static,)+
        {
            #[allow(non_snake_case, reason = "bindings reuse the type parameter names")]
            fn into_middlewares(self) -> Vec<Arc<dyn Middleware>> {
                let ($($middleware,)+) = self;
                vec![$(Arc::new($middleware) as Arc<dyn Middleware>),+]
            }
        }
    };
}

impl_into_middlewares_for_tuple!(A);
impl_into_middlewares_for_tuple!(A, B);
impl_into_middlewares_for_tuple!(A, B, C);
impl_into_middlewares_for_tuple!(A, B, C, D);
impl_into_middlewares_for_tuple!(A, B, C, D, E);
impl_into_middlewares_for_tuple!(A, B, C, D, E, F);
impl_into_middlewares_for_tuple!(A, B, C, D, E, F, G);
impl_into_middlewares_for_tuple!(A, B, C, D, E, F, G, H);

/// Middlewares in registration order.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one middleware or a sequence of them.
    pub fn add(&mut self, middlewares: impl IntoMiddlewares) -> &mut Self {
        self.middlewares.extend(middlewares.into_middlewares());
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs the chain over one request.
    ///
    /// `on_complete` runs once every middleware has advanced, which may happen later on
    /// another thread. When this call returns without reaching it, `on_partial` is
    /// called with the number of middlewares entered so far; a later continuation can
    /// still drive the chain to `on_complete`.
    pub fn run<C, P>(self: &Arc<Self>, request: RequestContext, response: ResponseContext, on_complete: C, on_partial: P)
    where
        C: FnOnce(&mut RequestContext, &mut ResponseContext) + Send + 'static,
        P: FnOnce(usize, &mut RequestContext, &mut ResponseContext),
    {
        let on_complete: CompleteFn = Box::new(on_complete);
        let run = Arc::new(ChainRun {
            chain: Arc::clone(self),
            control: Mutex::new(Control {
                executed: 0,
                driver: Some(thread::current().id()),
                advance_requested: false,
                completed: false,
            }),
            exchange: Mutex::new(Exchange { request, response }),
            on_complete: Mutex::new(Some(on_complete)),
        });

        run.drive();

        let executed = {
            let control = lock(&run.control);
            if control.completed {
                return;
            }
            control.executed
        };

        debug!(executed, total = self.len(), "middleware chain suspended");
        let mut exchange = lock(&run.exchange);
        let Exchange { request, response } = &mut *exchange;
        on_partial(executed, request, response);
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain").field("len", &self.middlewares.len()).finish()
    }
}

/// The continuation handed to a middleware.
pub struct Next {
    run: Arc<ChainRun>,
    step: usize,
}

impl Next {
    /// Hands over to the following middleware, or completes the chain after the last one.
    pub fn proceed(self) {
        self.run.advance(self.step);
    }

    /// Gives a deferred middleware access to the request and response.
    ///
    /// Returns `None` when called on the thread that is currently running a middleware,
    /// which already holds both.
    ///
    /// Under a [`Dispatcher`](crate::Dispatcher) the response has already been ended by
    /// the time a deferred continuation runs, so writes through it are ignored and a
    /// `proceed` that completes the chain does not route the request.
    pub fn with_exchange<R>(&self, f: impl FnOnce(&mut RequestContext, &mut ResponseContext) -> R) -> Option<R> {
        let current = thread::current().id();
        if lock(&self.run.control).driver == Some(current) {
            return None;
        }

        let mut exchange = lock(&self.run.exchange);
        let Exchange { request, response } = &mut *exchange;
        Some(f(request, response))
    }

    /// Position of the middleware this continuation belongs to, starting at 1.
    pub fn position(&self) -> usize {
        self.step
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("step", &self.step).finish_non_exhaustive()
    }
}

type CompleteFn = Box<dyn FnOnce(&mut RequestContext, &mut ResponseContext) + Send>;

struct ChainRun {
    chain: Arc<MiddlewareChain>,
    control: Mutex<Control>,
    exchange: Mutex<Exchange>,
    on_complete: Mutex<Option<CompleteFn>>,
}

struct Control {
    /// middlewares entered so far
    executed: usize,
    /// thread currently inside `drive`
    driver: Option<ThreadId>,
    advance_requested: bool,
    completed: bool,
}

struct Exchange {
    request: RequestContext,
    response: ResponseContext,
}

impl ChainRun {
    fn advance(self: &Arc<Self>, step: usize) {
        {
            let mut control = lock(&self.control);
            if control.completed || control.executed != step {
                debug!(step, executed = control.executed, "stale continuation ignored");
                return;
            }
            if control.driver.is_some() {
                control.advance_requested = true;
                return;
            }
            control.driver = Some(thread::current().id());
        }

        self.drive();
    }

    /// Enters middlewares until one returns without advancing, or the chain is exhausted.
    ///
    /// The caller must have registered itself as the driver.
    fn drive(self: &Arc<Self>) {
        let total = self.chain.len();

        loop {
            let index = {
                let mut control = lock(&self.control);
                if control.executed == total {
                    control.completed = true;
                    break;
                }
                control.executed += 1;
                control.executed - 1
            };

            let middleware = Arc::clone(&self.chain.middlewares[index]);
            let next = Next { run: Arc::clone(self), step: index + 1 };

            debug!(position = index + 1, total, "calling next middleware");
            {
                let mut exchange = lock(&self.exchange);
                let Exchange { request, response } = &mut *exchange;
                middleware.handle(request, response, next);
            }

            let mut control = lock(&self.control);
            if !control.advance_requested {
                control.driver = None;
                return;
            }
            control.advance_requested = false;
        }

        debug!(total, "done executing middlewares");
        self.complete();
        lock(&self.control).driver = None;
    }

    fn complete(&self) {
        let on_complete = lock(&self.on_complete).take();
        if let Some(on_complete) = on_complete {
            let mut exchange = lock(&self.exchange);
            let Exchange { request, response } = &mut *exchange;
            on_complete(request, response);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::{Method, StatusCode};

    use super::*;
    use crate::test_util::{buffered, context};

    type Trace = Arc<Mutex<Vec<String>>>;

    fn tracing_middleware(trace: &Trace, name: &'static str) -> impl Middleware + 'static {
        let trace = Arc::clone(trace);
        middleware_fn(move |_req, _resp, next| {
            trace.lock().unwrap().push(name.to_owned());
            next.proceed();
        })
    }

    fn run_chain(chain: MiddlewareChain, trace: &Trace) -> Option<usize> {
        let (response, _receiver) = buffered();
        let partial = Arc::new(Mutex::new(None));

        let complete_trace = Arc::clone(trace);
        let partial_result = Arc::clone(&partial);
        Arc::new(chain).run(
            context(Method::GET, "/"),
            response,
            move |_req, _resp| complete_trace.lock().unwrap().push("complete".to_owned()),
            move |executed, _req, _resp| *partial_result.lock().unwrap() = Some(executed),
        );

        partial.lock().unwrap().take()
    }

    #[test]
    fn empty_chain_completes_immediately() {
        let trace = Trace::default();

        let partial = run_chain(MiddlewareChain::new(), &trace);

        assert_eq!(partial, None);
        assert_eq!(*trace.lock().unwrap(), vec!["complete"]);
    }

    #[test]
    fn runs_in_order_exactly_once() {
        let trace = Trace::default();
        let mut chain = MiddlewareChain::new();
        chain.add(tracing_middleware(&trace, "first")).add((tracing_middleware(&trace, "second"), tracing_middleware(&trace, "third")));

        assert_eq!(chain.len(), 3);
        let partial = run_chain(chain, &trace);

        assert_eq!(partial, None);
        assert_eq!(*trace.lock().unwrap(), vec!["first", "second", "third", "complete"]);
    }

    #[test]
    fn stops_when_continuation_is_dropped() {
        let trace = Trace::default();
        let mut chain = MiddlewareChain::new();
        let stop_trace = Arc::clone(&trace);
        chain
            .add(tracing_middleware(&trace, "first"))
            .add(middleware_fn(move |_req, resp, _next| {
                stop_trace.lock().unwrap().push("stop".to_owned());
                resp.status(StatusCode::UNAUTHORIZED).end();
            }))
            .add(tracing_middleware(&trace, "never"));

        let partial = run_chain(chain, &trace);

        assert_eq!(partial, Some(2));
        assert_eq!(*trace.lock().unwrap(), vec!["first", "stop"]);
    }

    #[test]
    fn middleware_mutations_are_visible_downstream() {
        let seen = Arc::new(Mutex::new(None));
        let mut chain = MiddlewareChain::new();
        chain.add(middleware_fn(|_req, resp, next| {
            resp.status(StatusCode::ACCEPTED);
            next.proceed();
        }));

        let (response, _receiver) = buffered();
        let observed = Arc::clone(&seen);
        Arc::new(chain).run(
            context(Method::GET, "/"),
            response,
            move |_req, resp| *observed.lock().unwrap() = resp.status_code(),
            |_executed, _req, _resp| panic!("chain should complete"),
        );

        assert_eq!(*seen.lock().unwrap(), Some(StatusCode::ACCEPTED));
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut chain = MiddlewareChain::new();
        for _ in 0..10_000 {
            let counter = Arc::clone(&counter);
            chain.add(middleware_fn(move |_req, _resp, next| {
                counter.fetch_add(1, Ordering::SeqCst);
                next.proceed();
            }));
        }

        let trace = Trace::default();
        let partial = run_chain(chain, &trace);

        assert_eq!(partial, None);
        assert_eq!(counter.load(Ordering::SeqCst), 10_000);
    }

    #[test]
    fn with_exchange_is_none_while_running() {
        let answered = Arc::new(Mutex::new(None));
        let mut chain = MiddlewareChain::new();
        let result = Arc::clone(&answered);
        chain.add(middleware_fn(move |_req, _resp, next| {
            *result.lock().unwrap() = Some(next.with_exchange(|_req, _resp| ()).is_none());
            next.proceed();
        }));

        let trace = Trace::default();
        run_chain(chain, &trace);

        assert_eq!(*answered.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn deferred_continuation_completes_later() {
        let (sender, receiver) = tokio::sync::oneshot::channel::<Next>();
        let sender = Mutex::new(Some(sender));

        let trace = Trace::default();
        let mut chain = MiddlewareChain::new();
        chain.add(tracing_middleware(&trace, "first")).add(middleware_fn(move |_req, _resp, next| {
            if let Some(sender) = sender.lock().unwrap().take() {
                sender.send(next).unwrap();
            }
        }));
        chain.add(tracing_middleware(&trace, "third"));

        let partial = run_chain(chain, &trace);
        assert_eq!(partial, Some(2));
        assert_eq!(*trace.lock().unwrap(), vec!["first"]);

        let next = receiver.await.unwrap();
        let handle = tokio::spawn(async move {
            let status = next.with_exchange(|_req, resp| {
                resp.status(StatusCode::CREATED);
                resp.status_code()
            });
            next.proceed();
            status
        });

        assert_eq!(handle.await.unwrap(), Some(Some(StatusCode::CREATED)));
        assert_eq!(*trace.lock().unwrap(), vec!["first", "third", "complete"]);
    }

    #[test]
    fn continuation_from_another_thread() {
        let trace = Trace::default();
        let mut chain = MiddlewareChain::new();
        chain
            .add(middleware_fn(|_req, _resp, next| {
                thread::spawn(move || next.proceed());
            }))
            .add(tracing_middleware(&trace, "second"));

        let (response, _receiver) = buffered();
        let (done_sender, done_receiver) = std::sync::mpsc::channel();
        Arc::new(chain).run(
            context(Method::GET, "/"),
            response,
            move |_req, _resp| done_sender.send(()).unwrap(),
            |_executed, _req, _resp| {},
        );

        done_receiver.recv().unwrap();
        assert_eq!(*trace.lock().unwrap(), vec!["second"]);
    }
}
