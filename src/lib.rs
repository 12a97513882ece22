//! # overmux
//!
//! Route groups, middleware and API documentation on top of a plain request
//! multiplexer.
//!
//! ## The contract
//!
//! [`Mux`] matches paths and nothing else. It answers unknown paths with a
//! fixed `404 page not found` and wrong methods with a fixed `405`, and it
//! cannot be told otherwise. overmux never changes it. Everything is layered
//! on top:
//!
//! - **Groups**: nested [`Router`] nodes with concatenated base paths and
//!   inherited middleware, all writing into one registry.
//! - **Status overrides**: any status, the multiplexer's own 404 and 405
//!   included, can be replaced by a custom handler. The multiplexer writes
//!   into a decorated writer that swallows the response, and the override
//!   runs afterwards.
//! - **Documentation**: routes may carry [`Docs`]; the router assembles an
//!   OpenAPI 3.0 document from them and answers `OPTIONS` for every path.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use overmux::{Mux, Request, Response, ResponseWriter, Router, RouterConfig, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut app = Router::new(Mux::new(), RouterConfig::new("Example API", "1.0.0"));
//!     app.use_docs(true);
//!     app.not_found(|w: &mut dyn ResponseWriter, _req: &Request| {
//!         Response::builder().status(StatusCode::NOT_FOUND).text("Custom 404").write_to(w);
//!     });
//!
//!     app.get("/{$}", home);
//!     app.group("/users", |users| {
//!         users.get("/{id}", get_user);
//!     });
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! fn home(w: &mut dyn ResponseWriter, _req: &Request) {
//!     Response::text("Welcome").write_to(w);
//! }
//!
//! fn get_user(w: &mut dyn ResponseWriter, req: &Request) {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::text(format!("User ID: {id}")).write_to(w);
//! }
//! ```

mod config;
mod docs;
mod error;
mod handler;
mod method;
mod mux;
mod registry;
mod request;
mod response;
mod router;
mod schema;
mod server;
mod writer;

pub mod intercept;
pub mod middleware;
pub mod openapi;

pub use config::RouterConfig;
pub use docs::{DocIn, DocOut, Docs};
pub use error::Error;
pub use handler::{BoxedHandler, Handler, handler_fn, respond};
pub use intercept::DO_NOT_INTERCEPT;
pub use method::Method;
pub use mux::Mux;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder, write_error};
pub use router::{OpenApiHandler, Router};
pub use schema::{Describe, ObjectShape, Primitive, Shape};
pub use server::Server;
pub use writer::{Recorder, ResponseWriter};
