use std::fmt;
use std::sync::Arc;

use crate::request::RequestContext;
use crate::response::ResponseContext;

/// Answers a matched request, or a miss when registered as the not-found fallback.
///
/// All handlers of a route are invoked in order with the same contexts, whether or
/// not an earlier one already ended the response.
pub trait RequestHandler: Send + Sync {
    fn invoke(&self, req: &RequestContext, resp: &mut ResponseContext);
}

/// a plain `Fn` holder which represents a handler
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&RequestContext, &mut ResponseContext) + Send + Sync,
{
    fn new(f: F) -> Self {
        Self { f }
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&RequestContext, &mut ResponseContext) + Send + Sync,
{
    FnHandler::new(f)
}

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&RequestContext, &mut ResponseContext) + Send + Sync,
{
    fn invoke(&self, req: &RequestContext, resp: &mut ResponseContext) {
        (self.f)(req, resp);
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// One handler or an ordered sequence of them, as accepted at route registration.
pub trait IntoHandlers {
    fn into_handlers(self) -> Vec<Arc<dyn RequestHandler>>;
}

impl<H: RequestHandler + 'static> IntoHandlers for H {
    fn into_handlers(self) -> Vec<Arc<dyn RequestHandler>> {
        vec![Arc::new(self)]
    }
}

impl IntoHandlers for Vec<Arc<dyn RequestHandler>> {
    fn into_handlers(self) -> Vec<Arc<dyn RequestHandler>> {
        self
    }
}

macro_rules! impl_into_handlers_for_tuple {
    ($($handler:ident),+) => {
        impl<$($handler),+> IntoHandlers for ($($handler,)+)
        where
            $($handler: RequestHandler + 'static,)+
        {
            #[allow(non_snake_case, reason = "bindings reuse the type parameter names")]
            fn into_handlers(self) -> Vec<Arc<dyn RequestHandler>> {
                let ($($handler,)+) = self;
                vec![$(Arc::new($handler) as Arc<dyn RequestHandler>),+]
            }
        }
    };
}

impl_into_handlers_for_tuple!(A);
impl_into_handlers_for_tuple!(A, B);
impl_into_handlers_for_tuple!(A, B, C);
impl_into_handlers_for_tuple!(A, B, C, D);
impl_into_handlers_for_tuple!(A, B, C, D, E);
impl_into_handlers_for_tuple!(A, B, C, D, E, F);
impl_into_handlers_for_tuple!(A, B, C, D, E, F, G);
impl_into_handlers_for_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    #[test]
    fn fn_is_handler() {
        fn get(_req: &RequestContext, resp: &mut ResponseContext) {
            resp.end();
        }

        let handler = handler_fn(get);
        assert_is_handler(&handler);
    }

    #[test]
    fn closure_is_handler() {
        let greeting = String::from("hello");
        let handler = handler_fn(move |_req, resp| {
            resp.send(greeting.as_str());
        });
        assert_is_handler(&handler);
    }

    #[test]
    fn into_handlers_keeps_order() {
        let single = handler_fn(|_req, _resp| {}).into_handlers();
        assert_eq!(single.len(), 1);

        let tuple = (handler_fn(|_req, _resp| {}), handler_fn(|_req, _resp| {}), handler_fn(|_req, _resp| {})).into_handlers();
        assert_eq!(tuple.len(), 3);

        let list: Vec<Arc<dyn RequestHandler>> = Vec::new();
        assert!(list.into_handlers().is_empty());
    }
}
