use std::sync::{Arc, Mutex};

use http::{HeaderValue, StatusCode, Uri};
use overmux::middleware::{self, Middleware};
use overmux::{Method, Mux, Recorder, Request, Response, ResponseWriter, Router, RouterConfig, handler_fn, respond};

fn router() -> Router {
    Router::new(Mux::new(), RouterConfig::new("Test API", "1.0.0"))
}

fn send(router: &Router, method: Method, uri: &str) -> Recorder {
    let mut w = Recorder::new();
    let mut req = Request::new(method, uri.parse::<Uri>().unwrap());
    router.serve(&mut w, &mut req);
    w
}

fn home(w: &mut dyn ResponseWriter, _req: &Request) {
    Response::text("Welcome").write_to(w);
}

fn user(w: &mut dyn ResponseWriter, req: &Request) {
    Response::text(format!("User ID: {}", req.param("id").unwrap_or("?"))).write_to(w);
}

type Log = Arc<Mutex<Vec<String>>>;

fn tracer(log: Log, name: &'static str) -> impl Middleware {
    middleware::from_fn(move |w, req, next| {
        log.lock().unwrap().push(format!("{name}>"));
        next.serve(w, req);
        log.lock().unwrap().push(format!("<{name}"));
    })
}

fn logged(log: Log, name: &'static str) -> impl overmux::Handler {
    handler_fn(move |w, _req| {
        log.lock().unwrap().push(name.to_owned());
        w.write_header(StatusCode::NO_CONTENT);
    })
}

#[test]
fn exact_root_route() {
    let r = router();
    r.get("/{$}", home);

    let w = send(&r, Method::Get, "/");
    assert_eq!(w.status(), StatusCode::OK);
    assert_eq!(w.text(), "Welcome");
    assert_eq!(send(&r, Method::Get, "/elsewhere").status(), StatusCode::NOT_FOUND);
}

#[test]
fn path_parameters_bind() {
    let r = router();
    r.get("/users/{id}", user);

    let w = send(&r, Method::Get, "/users/123");
    assert_eq!(w.status(), StatusCode::OK);
    assert_eq!(w.text(), "User ID: 123");
}

#[test]
fn nested_groups_concatenate() {
    let r = router();
    r.group("/api", |api| {
        api.group("/v1", |v1| {
            v1.group("/users", |users| {
                users.get("", respond(|_req: &Request| "list"));
                users.get("/{id}", user);
            });
        });
        api.get("/status", respond(|_req: &Request| "up"));
    });

    assert_eq!(send(&r, Method::Get, "/api/v1/users").text(), "list");
    assert_eq!(send(&r, Method::Get, "/api/v1/users/7").text(), "User ID: 7");
    assert_eq!(send(&r, Method::Get, "/api/status").text(), "up");
    assert_eq!(send(&r, Method::Get, "/v1/users").status(), StatusCode::NOT_FOUND);
}

#[test]
fn ancestor_middleware_wraps_descendant_middleware() {
    let log: Log = Arc::default();
    let mut r = router();
    r.use_middleware(tracer(Arc::clone(&log), "root"));
    r.group("/admin", |admin| {
        admin.use_middleware(tracer(Arc::clone(&log), "admin"));
        admin.get("/panel", logged(Arc::clone(&log), "panel"));
    });

    send(&r, Method::Get, "/admin/panel");
    assert_eq!(*log.lock().unwrap(), ["root>", "admin>", "panel", "<admin", "<root"]);
}

#[test]
fn groups_snapshot_parent_middleware() {
    let log: Log = Arc::default();
    let mut r = router();
    r.use_middleware(tracer(Arc::clone(&log), "early"));
    r.group("/g", |g| {
        g.get("/x", logged(Arc::clone(&log), "x"));
    });
    // Added after the group ran: reaches neither the group nor earlier routes.
    r.use_middleware(tracer(Arc::clone(&log), "late"));
    r.get("/y", logged(Arc::clone(&log), "y"));

    send(&r, Method::Get, "/g/x");
    assert_eq!(*log.lock().unwrap(), ["early>", "x", "<early"]);

    log.lock().unwrap().clear();
    send(&r, Method::Get, "/y");
    assert_eq!(*log.lock().unwrap(), ["early>", "late>", "y", "<late", "<early"]);
}

#[test]
fn sibling_groups_do_not_share_middleware() {
    let log: Log = Arc::default();
    let r = router();
    r.group("/a", |a| {
        a.use_middleware(tracer(Arc::clone(&log), "a"));
        a.get("/", logged(Arc::clone(&log), "a-route"));
    });
    r.group("/b", |b| {
        b.get("/", logged(Arc::clone(&log), "b-route"));
    });

    send(&r, Method::Get, "/b/");
    assert_eq!(*log.lock().unwrap(), ["b-route"]);
}

#[test]
fn middleware_can_short_circuit() {
    let mut r = router();
    r.use_middleware(middleware::from_fn(|w, req, next| {
        if req.header("authorization").is_none() {
            w.write_header(StatusCode::UNAUTHORIZED);
            return;
        }
        next.serve(w, req);
    }));
    r.get("/secret", respond(|_req: &Request| "s3cret"));

    assert_eq!(send(&r, Method::Get, "/secret").status(), StatusCode::UNAUTHORIZED);

    let mut w = Recorder::new();
    let mut req = Request::new(Method::Get, Uri::from_static("/secret"))
        .with_header(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
    r.serve(&mut w, &mut req);
    assert_eq!(w.text(), "s3cret");
}

#[test]
fn every_method_shortcut_registers() {
    let r = router();
    r.get("/m", respond(|_req: &Request| "get"))
        .head("/h", respond(|_req: &Request| "head"))
        .post("/m", respond(|_req: &Request| "post"))
        .put("/m", respond(|_req: &Request| "put"))
        .patch("/m", respond(|_req: &Request| "patch"))
        .delete("/m", respond(|_req: &Request| "delete"))
        .options("/m", respond(|_req: &Request| "options"));

    for (method, body) in [
        (Method::Get, "get"),
        (Method::Post, "post"),
        (Method::Put, "put"),
        (Method::Patch, "patch"),
        (Method::Delete, "delete"),
        (Method::Options, "options"),
    ] {
        assert_eq!(send(&r, method, "/m").text(), body);
    }
    assert_eq!(send(&r, Method::Head, "/h").text(), "head");
}

#[test]
fn duplicate_route_across_groups_is_a_conflict() {
    let r = router();
    r.get("/api/users", home);
    r.group("/api", |api| {
        assert!(api.try_register(Method::Get, "/users", home, None).is_err());
        assert!(api.try_register(Method::Post, "/users", home, None).is_ok());
    });
}
