//! Route tree on top of a [`Mux`].
//!
//! A [`Router`] is one node of a tree: a base path plus its own middleware
//! list. [`group`](Router::group) creates children that extend both. Every
//! node writes into the same multiplexer and the same registry, so where a
//! route was declared never matters at request time.
//!
//! At request time the router adds three things the multiplexer cannot do on
//! its own:
//!
//! 1. redirects of trailing-slash paths (opt-in);
//! 2. replacement of any status with a registered override handler, the
//!    multiplexer's built-in 404 and 405 included (see [`intercept`](crate::intercept));
//! 3. `OPTIONS` discovery responses, installed on the first request once
//!    documentation is enabled.

use std::collections::HashSet;
use std::sync::Arc;

use http::header::{ALLOW, LOCATION};
use http::{HeaderValue, StatusCode};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::config::RouterConfig;
use crate::docs::{self, Docs};
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::intercept::{DO_NOT_INTERCEPT, HeaderEraser, StatusInterceptor};
use crate::method::Method;
use crate::middleware::{Chain, Middleware};
use crate::mux::Mux;
use crate::openapi::OpenApi;
use crate::registry::Registry;
use crate::request::Request;
use crate::response::Response;
use crate::writer::ResponseWriter;

/// One node of a route tree.
///
/// ```rust
/// use overmux::{Mux, Request, Response, ResponseWriter, Router, RouterConfig};
///
/// fn home(w: &mut dyn ResponseWriter, _req: &Request) {
///     Response::text("Welcome").write_to(w);
/// }
///
/// fn user(w: &mut dyn ResponseWriter, req: &Request) {
///     Response::text(format!("User ID: {}", req.param("id").unwrap_or("?"))).write_to(w);
/// }
///
/// let router = Router::new(Mux::new(), RouterConfig::new("Example API", "1.0.0"));
/// router.get("/{$}", home);
/// router.group("/users", |users| {
///     users.get("/{id}", user);
/// });
/// ```
pub struct Router {
    base_path: String,
    middlewares: Chain,
    docs_enabled: bool,
    redirect_trailing_slash: bool,
    shared: Arc<Shared>,
}

/// Owned by the whole tree.
struct Shared {
    mux: Mux,
    registry: RwLock<Registry>,
    redirect_status: StatusCode,
    max_body_size: usize,
}

impl Router {
    /// The root node of a new tree.
    pub fn new(mux: Mux, config: RouterConfig) -> Self {
        let shared = Shared {
            registry: RwLock::new(Registry::new(&config)),
            redirect_status: config.resolved_redirect_status(),
            max_body_size: config.max_body_size,
            mux,
        };
        Self {
            base_path: String::new(),
            middlewares: Chain::new(),
            docs_enabled: config.docs_enabled,
            redirect_trailing_slash: config.redirect_trailing_slash,
            shared: Arc::new(shared),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub(crate) fn max_body_size(&self) -> usize {
        self.shared.max_body_size
    }

    /// Builds a child node under `sub_path` and hands it to `f`.
    ///
    /// The child starts from a copy of this node's middleware: middleware
    /// added here afterwards does not reach it, and middleware added to the
    /// child never reaches this node.
    pub fn group(&self, sub_path: &str, f: impl FnOnce(&mut Router)) -> &Self {
        let mut child = Router {
            base_path: format!("{}{sub_path}", self.base_path),
            middlewares: self.middlewares.clone(),
            docs_enabled: self.docs_enabled,
            redirect_trailing_slash: self.redirect_trailing_slash,
            shared: Arc::clone(&self.shared),
        };
        f(&mut child);
        self
    }

    /// Appends a middleware to this node. Routes registered on this node or
    /// its later groups run inside it; earlier routes are unaffected.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Documents routes registered on this node from now on.
    pub fn use_docs(&mut self, enabled: bool) -> &mut Self {
        self.docs_enabled = enabled;
        self
    }

    pub fn redirect_trailing_slash(&mut self, redirect: bool) -> &mut Self {
        self.redirect_trailing_slash = redirect;
        self
    }

    /// Registers a route, reporting pattern errors and collisions.
    pub fn try_register(
        &self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
        docs: Option<Docs>,
    ) -> Result<(), Error> {
        let pattern = self.full_pattern(pattern);
        let handler = self.middlewares.then(Arc::new(handler));

        let mut registry = self.shared.registry.write();
        self.shared.mux.handle(method, &pattern, handler)?;
        registry.record_route(method, &pattern);
        if let Some(docs) = docs.filter(|_| self.docs_enabled) {
            docs::register_operation(&mut registry, method, &pattern, docs);
        }
        debug!(%method, pattern, layers = self.middlewares.len(), "route registered");
        Ok(())
    }

    /// Registers a route.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is malformed or already registered for `method`.
    pub fn on(&self, method: Method, pattern: &str, handler: impl Handler) -> &Self {
        self.register_or_panic(method, pattern, handler, None)
    }

    /// Registers a documented route.
    ///
    /// # Panics
    ///
    /// Same as [`on`](Self::on).
    pub fn on_documented(&self, method: Method, pattern: &str, handler: impl Handler, docs: Docs) -> &Self {
        self.register_or_panic(method, pattern, handler, Some(docs))
    }

    fn register_or_panic(&self, method: Method, pattern: &str, handler: impl Handler, docs: Option<Docs>) -> &Self {
        self.try_register(method, pattern, handler, docs)
            .unwrap_or_else(|e| panic!("invalid route {method} `{pattern}`: {e}"));
        self
    }

    fn full_pattern(&self, pattern: &str) -> String {
        let full = format!("{}{pattern}", self.base_path);
        if full.is_empty() {
            "/".to_owned()
        } else if !full.starts_with('/') {
            format!("/{full}")
        } else {
            full
        }
    }

    /// Replaces every response with `status`, whoever writes it, with
    /// `handler`. Handlers that need to send that status unchanged set
    /// [`DO_NOT_INTERCEPT`] first.
    pub fn handle_status(&self, status: StatusCode, handler: impl Handler) -> &Self {
        let handler: BoxedHandler = Arc::new(handler);
        self.shared.registry.write().status_handlers.insert(status, handler);
        debug!(%status, "status handler registered");
        self
    }

    pub fn not_found(&self, handler: impl Handler) -> &Self {
        self.handle_status(StatusCode::NOT_FOUND, handler)
    }

    /// The override runs with `Allow` already set to the methods registered
    /// for the requested path.
    pub fn method_not_allowed(&self, handler: impl Handler) -> &Self {
        self.handle_status(StatusCode::METHOD_NOT_ALLOWED, handler)
    }

    pub fn internal_error(&self, handler: impl Handler) -> &Self {
        self.handle_status(StatusCode::INTERNAL_SERVER_ERROR, handler)
    }

    /// Lists a server in the generated document.
    pub fn add_server(&self, url: impl Into<String>, description: impl Into<String>) -> &Self {
        let description = Some(description.into()).filter(|d| !d.is_empty());
        self.shared.registry.write().add_server(url.into(), description);
        self
    }

    /// A copy of the API document as registered so far.
    pub fn openapi(&self) -> OpenApi {
        self.shared.registry.read().snapshot()
    }

    pub fn openapi_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.openapi())?)
    }

    /// A handler serving the document as JSON, for mounting on this tree.
    pub fn openapi_handler(&self) -> OpenApiHandler {
        OpenApiHandler { shared: Arc::clone(&self.shared) }
    }

    /// Serves one request.
    pub fn serve(&self, w: &mut dyn ResponseWriter, req: &mut Request) {
        if self.docs_enabled {
            self.synthesize_options_once();
        }

        if self.redirect_trailing_slash && self.redirect(w, req) {
            return;
        }

        let overrides = self.shared.registry.read().status_handlers.clone();
        let intercepted = {
            let codes: HashSet<StatusCode> = overrides.keys().copied().collect();
            let mut interceptor = StatusInterceptor::new(HeaderEraser::new(w, [DO_NOT_INTERCEPT]), codes);
            self.shared.mux.serve(&mut interceptor, req);
            interceptor.intercepted()
        };

        let Some((status, handler)) = intercepted.and_then(|s| overrides.get(&s).map(|h| (s, h))) else {
            return;
        };

        // Overrides may emit a genuine status of their own; the sentinel
        // still never reaches the client.
        let mut w = HeaderEraser::new(w, [DO_NOT_INTERCEPT]);
        if status == StatusCode::METHOD_NOT_ALLOWED {
            let methods = self.shared.registry.read().methods_for(req.path());
            if !methods.is_empty() {
                if let Ok(allow) = HeaderValue::from_str(&Method::join(methods)) {
                    w.headers_mut().insert(ALLOW, allow);
                }
            }
        }
        handler.serve(&mut w, req);
    }

    fn synthesize_options_once(&self) {
        if self.shared.registry.read().options_synthesized {
            return;
        }
        let mut registry = self.shared.registry.write();
        if registry.options_synthesized {
            return;
        }
        docs::synthesize_options(&mut registry, &self.shared.mux);
        registry.options_synthesized = true;
    }

    /// Redirects `/path/` to `/path`. Returns whether it did.
    fn redirect(&self, w: &mut dyn ResponseWriter, req: &Request) -> bool {
        let path = req.path();
        let Some(trimmed) = path.strip_suffix('/').filter(|p| !p.is_empty()) else {
            return false;
        };
        let location = match req.uri().query() {
            Some(query) => format!("{trimmed}?{query}"),
            None => trimmed.to_owned(),
        };
        let Ok(location) = HeaderValue::from_str(&location) else {
            return false;
        };
        debug!(from = path, status = %self.shared.redirect_status, "trailing slash redirect");
        w.headers_mut().insert(LOCATION, location);
        w.write_header(self.shared.redirect_status);
        true
    }
}

/// Serves the live API document of a router tree as JSON.
pub struct OpenApiHandler {
    shared: Arc<Shared>,
}

impl Handler for OpenApiHandler {
    fn serve(&self, w: &mut dyn ResponseWriter, _req: &Request) {
        let doc = self.shared.registry.read().snapshot();
        match serde_json::to_vec(&doc) {
            Ok(body) => Response::json(body).write_to(w),
            Err(e) => {
                error!("openapi document not serializable: {e}");
                w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }
}

macro_rules! method_shortcuts {
    ($($name:ident => $method:ident),+ $(,)?) => {
        impl Router {
            $(
                #[doc = concat!("Registers a `", stringify!($method), "` route. Panics like [`on`](Self::on).")]
                pub fn $name(&self, pattern: &str, handler: impl Handler) -> &Self {
                    self.on(Method::$method, pattern, handler)
                }
            )+
        }
    };
}

method_shortcuts! {
    get => Get,
    head => Head,
    post => Post,
    put => Put,
    patch => Patch,
    delete => Delete,
    options => Options,
}

#[cfg(test)]
mod tests {
    use http::Uri;

    use super::*;
    use crate::handler::handler_fn;
    use crate::writer::Recorder;

    fn router() -> Router {
        Router::new(Mux::new(), RouterConfig::new("Test", "1.0.0"))
    }

    fn ok(body: &'static str) -> impl Handler {
        handler_fn(move |w, _req| Response::text(body).write_to(w))
    }

    fn send(router: &Router, method: Method, uri: &str) -> Recorder {
        let mut w = Recorder::new();
        let mut req = Request::new(method, uri.parse::<Uri>().unwrap());
        router.serve(&mut w, &mut req);
        w
    }

    #[test]
    fn patterns_are_normalized() {
        let r = router();
        assert_eq!(r.full_pattern(""), "/");
        assert_eq!(r.full_pattern("users"), "/users");
        r.group("api", |api| {
            assert_eq!(api.full_pattern(""), "/api");
            assert_eq!(api.full_pattern("/v1"), "/api/v1");
        });
    }

    #[test]
    fn groups_concatenate_base_paths() {
        let r = router();
        r.group("/api", |api| {
            api.group("/v1", |v1| {
                assert_eq!(v1.base_path(), "/api/v1");
                v1.get("/users", ok("users"));
            });
        });
        assert_eq!(send(&r, Method::Get, "/api/v1/users").text(), "users");
    }

    #[test]
    fn collisions_are_errors() {
        let r = router();
        r.get("/users", ok("a"));
        let err = r.try_register(Method::Get, "/users", ok("b"), None).unwrap_err();
        assert!(matches!(err, Error::RouteConflict { .. }));
    }

    #[test]
    #[should_panic(expected = "invalid route GET")]
    fn shortcut_panics_on_collision() {
        let r = router();
        r.get("/users", ok("a"));
        r.get("/users", ok("b"));
    }

    #[test]
    fn trailing_slash_redirect_keeps_query() {
        let mut r = router();
        r.redirect_trailing_slash(true);
        r.get("/users", ok("users"));

        let w = send(&r, Method::Get, "/users/?page=2");
        assert_eq!(w.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(w.header("location"), Some("/users?page=2"));
        assert_eq!(send(&r, Method::Get, "/").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn redirect_status_comes_from_config() {
        let config = RouterConfig::new("Test", "1")
            .redirect_trailing_slash(true)
            .redirect_status(StatusCode::MOVED_PERMANENTLY);
        let r = Router::new(Mux::new(), config);
        assert_eq!(send(&r, Method::Get, "/a/").status(), StatusCode::MOVED_PERMANENTLY);
    }

    #[test]
    fn docs_only_recorded_when_enabled() {
        let mut r = router();
        r.on_documented(Method::Get, "/hidden", ok(""), Docs::new().summary("hidden"));
        r.use_docs(true);
        r.on_documented(Method::Get, "/shown", ok(""), Docs::new().summary("shown"));

        let doc = r.openapi();
        assert!(!doc.paths.contains_key("/hidden"));
        assert_eq!(doc.paths["/shown"].get.as_ref().unwrap().summary.as_deref(), Some("shown"));
    }

    #[test]
    fn empty_server_description_is_omitted() {
        let r = router();
        r.add_server("http://localhost:3210", "");
        let doc = r.openapi();
        assert_eq!(doc.servers[0].url, "http://localhost:3210");
        assert!(doc.servers[0].description.is_none());
    }
}
