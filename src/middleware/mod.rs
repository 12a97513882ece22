//! Middleware layer.
//!
//! A middleware turns one handler into another: it receives the next handler
//! in line and returns a handler that runs code around it. Cross-cutting
//! concerns such as request ids, timing, CORS or panic recovery belong here;
//! this module provides the plumbing, not the concerns.
//!
//! # Ordering
//!
//! A [`Chain`] is applied once, when a route is registered:
//!
//! ```text
//! chain = [a, b, c]          (pushed in that order)
//! chain.then(h) = a(b(c(h)))
//!
//! request  → a → b → c → h
//! response ← a ← b ← c ← h
//! ```
//!
//! The first middleware pushed sees the request first and the response last.
//! Route groups start from a copy of their parent's chain, so ancestor
//! middleware always wraps descendant middleware.

use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Wraps a handler in another handler.
///
/// Implemented for every `Fn(BoxedHandler) -> BoxedHandler`. Use
/// [`from_fn`] for the common "run code around `next`" shape.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Ordered, cloneable list of middleware.
///
/// Cloning copies the list, not the middleware: a clone taken for a route
/// group does not see middleware pushed onto the original afterwards.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `middleware` as the innermost layer so far.
    pub fn push(&mut self, middleware: impl Middleware) {
        self.layers.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wraps `handler` in every layer, first-pushed outermost.
    pub fn then(&self, handler: BoxedHandler) -> BoxedHandler {
        self.layers
            .iter()
            .rev()
            .fold(handler, |next, layer| layer.wrap(next))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("layers", &self.layers.len()).finish()
    }
}

/// Builds a middleware from a function that receives the next handler.
///
/// ```rust
/// use overmux::middleware;
/// use http::HeaderValue;
///
/// let server_header = middleware::from_fn(|w, req, next| {
///     w.headers_mut().insert("server", HeaderValue::from_static("overmux"));
///     next.serve(w, req);
/// });
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request, &BoxedHandler) + Send + Sync + 'static,
{
    FromFn { f: Arc::new(f) }
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F> {
    f: Arc<F>,
}

impl<F> Middleware for FromFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request, &BoxedHandler) + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Around { f: Arc::clone(&self.f), next })
    }
}

struct Around<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F> Handler for Around<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request, &BoxedHandler) + Send + Sync + 'static,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        (self.f)(w, req, &self.next)
    }
}
