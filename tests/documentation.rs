use std::sync::Arc;
use std::thread;

use http::{StatusCode, Uri};
use overmux::openapi::{Parameter, Schema, SchemaType};
use overmux::{
    Describe, DocIn, DocOut, Docs, Method, Mux, ObjectShape, Recorder, Request, Response, ResponseWriter, Router,
    RouterConfig, Shape,
};
use serde_json::json;

struct User;

impl Describe for User {
    fn describe() -> Shape {
        ObjectShape::new("User").field_as::<String>("ID", "id").field_as::<String>("Name", "name").into()
    }
}

struct Blog;

impl Describe for Blog {
    fn describe() -> Shape {
        ObjectShape::new("Blog").field_as::<String>("ID", "id").field_as::<String>("Title", "title").into()
    }
}

fn documented() -> Router {
    Router::new(Mux::new(), RouterConfig::new("Example API", "1.0.0").docs_enabled(true))
}

fn send(router: &Router, method: Method, path: &str) -> Recorder {
    let mut w = Recorder::new();
    let mut req = Request::new(method, path.parse::<Uri>().unwrap());
    router.serve(&mut w, &mut req);
    w
}

fn noop(w: &mut dyn ResponseWriter, _req: &Request) {
    Response::text("ok").write_to(w);
}

fn user_out() -> DocOut {
    DocOut::new("application/json", "The user object.").body::<User>()
}

#[test]
fn shared_type_registers_one_component() {
    let r = documented();
    r.on_documented(Method::Get, "/users/{id}", noop, Docs::new().output("200", user_out()));
    r.on_documented(Method::Put, "/users/{id}", noop, Docs::new().input("application/json", DocIn::of::<User>()).output("200", user_out()));

    let doc = r.openapi();
    assert_eq!(doc.components.schemas.len(), 1);
    let user = &doc.components.schemas["User"];
    assert_eq!(user.properties.keys().collect::<Vec<_>>(), ["id", "name"]);
}

#[test]
fn document_structure() {
    let r = documented();
    r.add_server("http://localhost:3210", "Demonstration of the example API.");
    r.on_documented(Method::Get, "/{$}", noop, Docs::new().summary("Home Page").output("200", DocOut::new("text/html", "The home page.")));
    r.group("/users", |users| {
        users.on_documented(
            Method::Get,
            "",
            noop,
            Docs::new()
                .tag("users")
                .summary("User List")
                .output("200", DocOut::new("application/json", "The list of users.").body::<Vec<User>>()),
        );
        users.on_documented(
            Method::Get,
            "/{id}",
            noop,
            Docs::new()
                .summary("Get User")
                .parameter(Parameter::path("id").description("The ID of the user."))
                .output("200", user_out()),
        );
    });
    r.on_documented(
        Method::Post,
        "/blogs",
        noop,
        Docs::new()
            .input("application/json", DocIn::of::<Blog>().required(true))
            .output("201", DocOut::new("application/json", "Created.").body::<Blog>()),
    );

    let doc = serde_json::to_value(r.openapi()).unwrap();
    assert_eq!(doc["openapi"], "3.0.1");
    assert_eq!(doc["info"], json!({"title": "Example API", "version": "1.0.0"}));
    assert_eq!(doc["servers"][0]["url"], "http://localhost:3210");

    assert_eq!(doc["paths"]["/"]["get"]["operationId"], "GETRoot");
    assert_eq!(doc["paths"]["/"]["get"]["responses"]["200"], json!({"description": "The home page.", "content": {"text/html": {}}}));

    let list = &doc["paths"]["/users"]["get"];
    assert_eq!(list["operationId"], "GETUsers");
    assert_eq!(list["tags"], json!(["users"]));
    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/User"}}),
    );

    let get = &doc["paths"]["/users/{id}"]["get"];
    assert_eq!(get["operationId"], "GETUsersId");
    assert_eq!(get["parameters"][0]["in"], "path");

    let post = &doc["paths"]["/blogs"]["post"];
    assert_eq!(post["requestBody"]["required"], true);
    assert_eq!(post["requestBody"]["content"]["application/json"]["schema"]["$ref"], "#/components/schemas/Blog");

    assert_eq!(
        doc["components"]["schemas"]["Blog"],
        json!({"type": "object", "properties": {"id": {"type": "string"}, "title": {"type": "string"}}}),
    );
}

#[test]
fn redeclared_operation_replaces_earlier_one() {
    let r = documented();
    r.on_documented(Method::Get, "/a", noop, Docs::new().summary("first"));
    r.group("/a", |a| {
        a.on_documented(Method::Post, "", noop, Docs::new().summary("post"));
    });
    // Distinct routes, one documented path.
    r.on_documented(Method::Get, "/a/{$}", noop, Docs::new().summary("one"));
    r.on_documented(Method::Get, "/a/", noop, Docs::new().summary("two"));

    let doc = r.openapi();
    assert_eq!(doc.paths["/a"].get.as_ref().unwrap().summary.as_deref(), Some("first"));
    assert_eq!(doc.paths["/a"].post.as_ref().unwrap().summary.as_deref(), Some("post"));
    assert_eq!(doc.paths["/a/"].get.as_ref().unwrap().summary.as_deref(), Some("two"));
}

#[test]
fn options_are_synthesized_on_first_request() {
    let r = documented();
    r.get("/users", noop).post("/users", noop);
    r.get("/users/{id}", noop).delete("/users/{id}", noop);

    let w = send(&r, Method::Options, "/users");
    assert_eq!(w.status(), StatusCode::NO_CONTENT);
    assert_eq!(w.header("allow"), Some("GET, POST, OPTIONS"));
    assert!(w.body().is_empty());

    let w = send(&r, Method::Options, "/users/42");
    assert_eq!(w.header("allow"), Some("GET, DELETE, OPTIONS"));
}

#[test]
fn options_are_not_recomputed_for_later_routes() {
    let r = documented();
    r.get("/users", noop);
    send(&r, Method::Get, "/users");

    r.post("/users", noop);
    r.get("/late", noop);

    assert_eq!(send(&r, Method::Options, "/users").header("allow"), Some("GET, OPTIONS"));
    assert_eq!(send(&r, Method::Options, "/late").status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn explicit_options_route_wins() {
    let r = documented();
    r.get("/cors", noop);
    r.options("/cors", |w: &mut dyn ResponseWriter, _req: &Request| w.write_header(StatusCode::OK));

    let w = send(&r, Method::Options, "/cors");
    assert_eq!(w.status(), StatusCode::OK);
    assert!(w.header("allow").is_none());
}

#[test]
fn no_options_without_docs() {
    let r = Router::new(Mux::new(), RouterConfig::new("Plain", "1"));
    r.get("/users", noop);
    let w = send(&r, Method::Options, "/users");
    assert_eq!(w.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn concurrent_first_requests_synthesize_once() {
    let r = Arc::new(documented());
    r.get("/users", noop).post("/users", noop);

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let r = Arc::clone(&r);
            thread::spawn(move || send(&r, Method::Options, "/users"))
        })
        .collect();

    for worker in workers {
        let w = worker.join().unwrap();
        assert_eq!(w.status(), StatusCode::NO_CONTENT);
        assert_eq!(w.header("allow"), Some("GET, POST, OPTIONS"));
    }
}

#[test]
fn options_method_recorded_for_405_allow() {
    let r = documented();
    r.get("/users", noop);
    r.method_not_allowed(|w: &mut dyn ResponseWriter, _req: &Request| w.write_header(StatusCode::METHOD_NOT_ALLOWED));

    let w = send(&r, Method::Delete, "/users");
    assert_eq!(w.header("allow"), Some("GET, OPTIONS"));
}

#[test]
fn document_is_served_as_json() {
    let r = documented();
    r.get("/openapi.json", r.openapi_handler());
    r.on_documented(Method::Get, "/users/{id}", noop, Docs::new().output("200", user_out()));

    let w = send(&r, Method::Get, "/openapi.json");
    assert_eq!(w.header("content-type"), Some("application/json"));
    let doc: serde_json::Value = serde_json::from_slice(w.body()).unwrap();
    assert_eq!(doc["paths"]["/users/{id}"]["get"]["operationId"], "GETUsersId");
    assert_eq!(doc["components"]["schemas"]["User"]["type"], "object");
}

#[test]
fn openapi_json_is_pretty() {
    let r = documented();
    r.on_documented(Method::Get, "/ping", noop, Docs::new());
    let json = r.openapi_json().unwrap();
    assert!(json.contains("\n  \"openapi\": \"3.0.1\""));
}

#[test]
fn unsupported_fields_document_as_strings() {
    struct Event;
    impl Describe for Event {
        fn describe() -> Shape {
            ObjectShape::new("Event").field::<serde_json::Value>("payload").field::<f64>("score").into()
        }
    }

    let r = documented();
    r.on_documented(Method::Post, "/events", noop, Docs::new().input("application/json", DocIn::of::<Event>()));

    let event = &r.openapi().components.schemas["Event"];
    assert_eq!(event.properties["payload"], Schema::of(SchemaType::String));
    assert_eq!(event.properties["score"], Schema::of(SchemaType::Number));
}
