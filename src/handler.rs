//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The multiplexer keeps handlers of different concrete types in one table,
//! and middleware wraps them in yet more types. Everything is therefore
//! erased to a single trait object, [`BoxedHandler`]:
//!
//! ```text
//! fn home(w, req) { … }                  ← user writes this
//!        ↓ router.get("/", home)
//! Arc::new(home) as BoxedHandler          ← blanket impl below
//!        ↓ chain.then(handler)
//! Arc<MiddlewareN<…<Middleware1<home>>>>  ← still one BoxedHandler
//!        ↓ mux.handle(method, pattern, …)
//! handler.serve(w, req) at request time   ← one vtable dispatch per layer
//! ```
//!
//! Handlers are synchronous: they write into a [`ResponseWriter`] that
//! buffers, so nothing here waits on I/O. A handler cannot `.await`; it may
//! block, since [`Server`](crate::Server) runs each request on tokio's
//! blocking thread pool. The request body is fully read before the handler
//! starts.

use std::sync::Arc;

use crate::request::Request;
use crate::response::IntoResponse;
use crate::writer::ResponseWriter;

/// Anything that can answer a request by writing to a [`ResponseWriter`].
///
/// Implemented automatically for every function or closure with the
/// signature `Fn(&mut dyn ResponseWriter, &Request)`:
///
/// ```rust
/// use overmux::{Request, Response, ResponseWriter};
///
/// fn home(w: &mut dyn ResponseWriter, _req: &Request) {
///     Response::text("Welcome").write_to(w);
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request);
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        self(w, req)
    }
}

/// Pins a closure to the handler signature.
///
/// Closures passed straight to a generic `impl Handler` parameter cannot
/// have their argument types inferred; routing them through here fixes that:
///
/// ```rust
/// use overmux::{handler_fn, Response};
///
/// let echo = handler_fn(|w, req| {
///     Response::text(req.path().to_owned()).write_to(w);
/// });
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    f
}

/// Adapts a function returning [`IntoResponse`] into a [`Handler`].
///
/// ```rust
/// use overmux::{respond, Request};
///
/// let hello = respond(|req: &Request| format!("User ID: {}", req.param("id").unwrap_or("?")));
/// ```
pub fn respond<F, R>(f: F) -> impl Handler
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoResponse + 'static,
{
    move |w: &mut dyn ResponseWriter, req: &Request| f(req).into_response().write_to(w)
}
