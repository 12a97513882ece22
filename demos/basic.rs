//! Example API: route groups, custom error pages and a generated document.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3210/
//!   curl http://localhost:3210/users/42
//!   curl -X DELETE -i http://localhost:3210/users        # custom 405, Allow: GET, OPTIONS
//!   curl -X OPTIONS -i http://localhost:3210/users/42    # Allow: GET, DELETE, OPTIONS
//!   curl http://localhost:3210/nowhere                   # custom 404
//!   curl http://localhost:3210/openapi.json

use http::{HeaderValue, StatusCode};
use overmux::openapi::Parameter;
use overmux::{
    ContentType, Describe, DocIn, DocOut, Docs, Method, Mux, ObjectShape, Request, Response, ResponseWriter, Router,
    RouterConfig, Server, Shape, middleware,
};

struct User;

impl Describe for User {
    fn describe() -> Shape {
        ObjectShape::new("User")
            .field_as::<String>("ID", "id")
            .field_as::<String>("Name", "name")
            .into()
    }
}

struct Blog;

impl Describe for Blog {
    fn describe() -> Shape {
        ObjectShape::new("Blog")
            .field_as::<String>("ID", "id")
            .field_as::<String>("Title", "title")
            .into()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = RouterConfig::new("Example API", "1.0.0")
        .description("Demonstration of the overmux router.")
        .docs_enabled(true)
        .redirect_trailing_slash(true);
    let mut app = Router::new(Mux::new(), config);
    app.add_server("http://localhost:3210", "Local development server.");

    app.use_middleware(middleware::from_fn(|w, req, next| {
        w.headers_mut().insert("x-served-by", HeaderValue::from_static("overmux"));
        next.serve(w, req);
    }));

    app.not_found(not_found);
    app.method_not_allowed(method_not_allowed);

    app.on_documented(
        Method::Get,
        "/{$}",
        home,
        Docs::new()
            .summary("Home Page")
            .output("200", DocOut::new("text/html", "The home page.")),
    );
    app.get("/openapi.json", app.openapi_handler());

    app.group("/users", |users| {
        users.on_documented(
            Method::Get,
            "",
            list_users,
            Docs::new()
                .tag("users")
                .summary("User List")
                .output("200", DocOut::new("application/json", "The list of users.").body::<Vec<User>>()),
        );
        users.on_documented(
            Method::Get,
            "/{id}",
            get_user,
            Docs::new()
                .tag("users")
                .summary("Get User")
                .parameter(Parameter::path("id").description("The ID of the user."))
                .output("200", DocOut::new("application/json", "The user object.").body::<User>()),
        );
        users.delete("/{id}", delete_user);
    });

    app.group("/blog", |blog| {
        blog.on_documented(
            Method::Post,
            "",
            create_post,
            Docs::new()
                .tag("blog")
                .summary("Create Post")
                .input("application/json", DocIn::of::<Blog>().required(true))
                .output("201", DocOut::new("application/json", "The new post.").body::<Blog>()),
        );
    });

    Server::bind("0.0.0.0:3210")
        .serve(app)
        .await
        .expect("server error");
}

fn home(w: &mut dyn ResponseWriter, _req: &Request) {
    Response::builder()
        .bytes(ContentType::Html, "<h1>Welcome</h1>")
        .write_to(w);
}

fn list_users(w: &mut dyn ResponseWriter, _req: &Request) {
    Response::json(r#"[{"id":"1","name":"alice"},{"id":"2","name":"bob"}]"#).write_to(w);
}

fn get_user(w: &mut dyn ResponseWriter, req: &Request) {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#)).write_to(w);
}

fn delete_user(w: &mut dyn ResponseWriter, _req: &Request) {
    w.write_header(StatusCode::NO_CONTENT);
}

fn create_post(w: &mut dyn ResponseWriter, req: &Request) {
    if req.body().is_empty() {
        w.write_header(StatusCode::BAD_REQUEST);
        return;
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/blog/99")
        .json(r#"{"id":"99","title":"new post"}"#)
        .write_to(w);
}

fn not_found(w: &mut dyn ResponseWriter, req: &Request) {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .text(format!("Custom 404 - nothing at {}", req.path()))
        .write_to(w);
}

fn method_not_allowed(w: &mut dyn ResponseWriter, _req: &Request) {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .text("Custom 405 - Method Not Allowed")
        .write_to(w);
}
