//! Per-route documentation and the document synthesizer.
//!
//! A [`Docs`] value travels with a route registration and is consumed right
//! there: its metadata becomes an [`Operation`], and the shapes of its
//! inputs and outputs become schema components. Nothing here runs while
//! requests are served, except [`synthesize_options`], which runs once, on
//! the first request.
//!
//! Two merge policies apply, deliberately different:
//!
//! - operations: the last declaration for a `{path, method}` wins;
//! - schema components: the first shape registered under a name wins.

use std::sync::Arc;

use http::header::ALLOW;
use http::{HeaderValue, StatusCode};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::handler::{BoxedHandler, handler_fn};
use crate::method::Method;
use crate::mux::Mux;
use crate::openapi::{
    MediaType, Operation, Parameter, RequestBody, Response, Schema, SchemaType, SecurityRequirement,
};
use crate::registry::{Registry, documented_path};
use crate::schema::{Describe, ObjectShape, Shape};

/// Documentation declared alongside a route.
///
/// ```rust
/// use overmux::{DocOut, Docs};
/// use overmux::openapi::Parameter;
/// # use overmux::{Describe, ObjectShape, Shape};
/// # struct User;
/// # impl Describe for User {
/// #     fn describe() -> Shape { ObjectShape::new("User").field::<String>("id").into() }
/// # }
///
/// let docs = Docs::new()
///     .summary("Get User")
///     .description("Retrieves a user by ID.")
///     .parameter(Parameter::path("id").description("The ID of the user."))
///     .output("200", DocOut::new("application/json", "The user object.").body::<User>());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Docs {
    tags: Vec<String>,
    summary: Option<String>,
    description: Option<String>,
    parameters: Vec<Parameter>,
    request_body: Option<RequestBody>,
    responses: IndexMap<String, Response>,
    security: Vec<SecurityRequirement>,
    inputs: IndexMap<String, DocIn>,
    outputs: IndexMap<String, DocOut>,
}

impl Docs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// An explicit request body. Replaced by [`input`](Self::input)s, if any.
    pub fn request_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    /// An explicit response entry. An [`output`](Self::output) for the same
    /// status replaces it.
    pub fn response(mut self, status: impl Into<String>, response: Response) -> Self {
        self.responses.insert(status.into(), response);
        self
    }

    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.security.push(requirement);
        self
    }

    /// A request body shape for one content type.
    pub fn input(mut self, content_type: impl Into<String>, input: DocIn) -> Self {
        self.inputs.insert(content_type.into(), input);
        self
    }

    /// A response for one status code (`"200"`, `"404"`, ...).
    pub fn output(mut self, status: impl Into<String>, output: DocOut) -> Self {
        self.outputs.insert(status.into(), output);
        self
    }
}

/// A request body declaration.
#[derive(Debug, Clone)]
pub struct DocIn {
    shape: Shape,
    required: bool,
}

impl DocIn {
    pub fn of<T: Describe + ?Sized>() -> Self {
        Self { shape: T::describe(), required: false }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// A response declaration. Without a body shape the response is documented
/// by content type alone.
#[derive(Debug, Clone)]
pub struct DocOut {
    content_type: String,
    description: String,
    shape: Option<Shape>,
}

impl DocOut {
    pub fn new(content_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self { content_type: content_type.into(), description: description.into(), shape: None }
    }

    pub fn body<T: Describe + ?Sized>(mut self) -> Self {
        self.shape = Some(T::describe());
        self
    }
}

// ── Synthesis ────────────────────────────────────────────────────────────────

/// Records the operation for `method` on `pattern`, replacing any earlier one.
pub(crate) fn register_operation(registry: &mut Registry, method: Method, pattern: &str, docs: Docs) {
    let path = documented_path(pattern);

    let mut responses = docs.responses;
    responses.extend(translate_outputs(docs.outputs, &mut registry.schemas));
    let request_body = translate_inputs(docs.inputs, &mut registry.schemas).or(docs.request_body);

    let op = Operation {
        tags: docs.tags,
        summary: docs.summary,
        description: docs.description,
        operation_id: operation_id(method, &path),
        parameters: docs.parameters,
        request_body,
        responses,
        security: docs.security,
    };
    debug!(%method, path, operation_id = op.operation_id, "operation documented");
    registry.descriptor(pattern).operations.insert(method, op);
}

pub(crate) fn translate_outputs(
    outputs: IndexMap<String, DocOut>,
    components: &mut IndexMap<String, Schema>,
) -> IndexMap<String, Response> {
    outputs
        .into_iter()
        .map(|(status, out)| {
            let media = MediaType { schema: out.shape.as_ref().map(|s| schema_for(s, components)) };
            let response = Response {
                description: out.description,
                content: IndexMap::from([(out.content_type, media)]),
            };
            (status, response)
        })
        .collect()
}

pub(crate) fn translate_inputs(
    inputs: IndexMap<String, DocIn>,
    components: &mut IndexMap<String, Schema>,
) -> Option<RequestBody> {
    if inputs.is_empty() {
        return None;
    }
    let required = inputs.values().any(|i| i.required);
    let content = inputs
        .into_iter()
        .map(|(content_type, input)| {
            (content_type, MediaType { schema: Some(schema_for(&input.shape, components)) })
        })
        .collect();
    Some(RequestBody { description: None, content, required })
}

/// The schema to embed where `shape` is used. Objects are registered as
/// components and referenced.
fn schema_for(shape: &Shape, components: &mut IndexMap<String, Schema>) -> Schema {
    match shape {
        Shape::Primitive(p) => Schema::of(p.schema_type()),
        Shape::Array(items) => Schema::array(schema_for(items, components)),
        Shape::Object(object) => {
            register_component(object, components);
            Schema::reference(&object.name)
        }
        Shape::Unsupported => Schema::of(SchemaType::String),
    }
}

fn register_component(object: &ObjectShape, components: &mut IndexMap<String, Schema>) {
    if components.contains_key(&object.name) {
        return;
    }
    // Placeholder first, so a field referring back to this type stops here.
    components.insert(object.name.clone(), Schema::of(SchemaType::Object));

    let properties = object
        .fields
        .iter()
        .map(|field| (field.key().to_owned(), schema_for(&field.shape(), components)))
        .collect();
    components.insert(object.name.clone(), Schema { properties, ..Schema::of(SchemaType::Object) });
    debug!(name = object.name, "schema component registered");
}

/// `GET /users/{id}` → `GETUsersId`; the root path is `Root`.
pub(crate) fn operation_id(method: Method, path: &str) -> String {
    let path = if path.is_empty() || path == "/" { "root" } else { path };
    let mut id = method.as_str().to_owned();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let segment = segment.trim_start_matches('{').trim_end_matches('}').trim_end_matches("...");
        let mut prev = ' ';
        for c in segment.chars() {
            if is_word_separator(prev) {
                id.extend(c.to_uppercase());
            } else {
                id.push(c);
            }
            prev = c;
        }
    }
    id
}

/// Word boundaries for capitalization: anything but letters, digits and `_`.
fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        !(c.is_ascii_alphanumeric() || c == '_')
    } else {
        c.is_whitespace()
    }
}

/// Installs an `OPTIONS` handler on every path that does not have one.
///
/// `Allow` lists the methods known for the path at this moment plus
/// `OPTIONS`. Paths registered afterwards get no handler.
pub(crate) fn synthesize_options(registry: &mut Registry, mux: &Mux) {
    for (path, descriptor) in registry.paths.iter_mut() {
        if descriptor.methods.is_empty() || descriptor.methods.contains(&Method::Options) {
            continue;
        }

        let mut methods = descriptor.methods.clone();
        methods.insert(Method::Options);
        let allow = match HeaderValue::from_str(&Method::join(methods.iter().copied())) {
            Ok(v) => v,
            Err(e) => {
                warn!(path, "skipping options handler: {e}");
                continue;
            }
        };

        match mux.handle(Method::Options, &descriptor.pattern, discovery_handler(allow)) {
            Ok(()) => {
                debug!(path, "options handler installed");
                descriptor.methods = methods;
            }
            Err(e) => warn!(path, "options handler not installed: {e}"),
        }
    }
}

fn discovery_handler(allow: HeaderValue) -> BoxedHandler {
    Arc::new(handler_fn(move |w, _req| {
        w.headers_mut().insert(ALLOW, allow.clone());
        w.write_header(StatusCode::NO_CONTENT);
    }))
}

#[cfg(test)]
mod tests {
    use http::Uri;

    use super::*;
    use crate::config::RouterConfig;
    use crate::request::Request;
    use crate::writer::Recorder;

    struct User;

    impl Describe for User {
        fn describe() -> Shape {
            ObjectShape::new("User").field_as::<String>("ID", "id").field_as::<String>("Name", "name").into()
        }
    }

    struct Team;

    impl Describe for Team {
        fn describe() -> Shape {
            ObjectShape::new("Team").field::<String>("name").field::<Vec<User>>("members").field::<User>("lead").into()
        }
    }

    fn registry() -> Registry {
        Registry::new(&RouterConfig::new("Test", "1"))
    }

    #[test]
    fn operation_ids() {
        assert_eq!(operation_id(Method::Get, "/users/{id}"), "GETUsersId");
        assert_eq!(operation_id(Method::Get, "/"), "GETRoot");
        assert_eq!(operation_id(Method::Post, ""), "POSTRoot");
        assert_eq!(operation_id(Method::Get, "/files/{path...}"), "GETFilesPath");
        assert_eq!(operation_id(Method::Delete, "/api/"), "DELETEApi");
        assert_eq!(operation_id(Method::Get, "/user-profile"), "GETUser-Profile");
        assert_eq!(operation_id(Method::Get, "/v1.beta/{user_id}"), "GETV1.BetaUser_id");
    }

    #[test]
    fn outputs_reference_components() {
        let mut components = IndexMap::new();
        let outputs = IndexMap::from([
            ("200".to_owned(), DocOut::new("application/json", "The users.").body::<Vec<User>>()),
            ("201".to_owned(), DocOut::new("application/json", "Created.").body::<User>()),
            ("204".to_owned(), DocOut::new("text/plain", "Nothing.")),
        ]);

        let responses = translate_outputs(outputs, &mut components);

        let list = responses["200"].content["application/json"].schema.as_ref().unwrap();
        assert_eq!(*list, Schema::array(Schema::reference("User")));
        let one = responses["201"].content["application/json"].schema.as_ref().unwrap();
        assert_eq!(*one, Schema::reference("User"));
        assert!(responses["204"].content["text/plain"].schema.is_none());

        assert_eq!(components.len(), 1);
        let user = &components["User"];
        assert_eq!(user.schema_type, Some(SchemaType::Object));
        assert_eq!(user.properties.keys().collect::<Vec<_>>(), ["id", "name"]);
    }

    #[test]
    fn primitive_outputs_are_inlined() {
        let mut components = IndexMap::new();
        let outputs = IndexMap::from([("200".to_owned(), DocOut::new("text/plain", "Count.").body::<u64>())]);
        let responses = translate_outputs(outputs, &mut components);
        assert_eq!(
            responses["200"].content["text/plain"].schema,
            Some(Schema::of(SchemaType::Integer)),
        );
        assert!(components.is_empty());
    }

    #[test]
    fn nested_objects_get_their_own_components() {
        let mut components = IndexMap::new();
        schema_for(&Team::describe(), &mut components);

        assert_eq!(components.keys().collect::<Vec<_>>(), ["Team", "User"]);
        let team = &components["Team"];
        assert_eq!(team.properties["members"], Schema::array(Schema::reference("User")));
        assert_eq!(team.properties["lead"], Schema::reference("User"));
    }

    #[test]
    fn first_component_wins() {
        let mut components = IndexMap::new();
        schema_for(&ObjectShape::new("User").field::<u8>("only").into(), &mut components);
        schema_for(&User::describe(), &mut components);
        assert_eq!(components["User"].properties.keys().collect::<Vec<_>>(), ["only"]);
    }

    #[test]
    fn unsupported_degrades_to_string() {
        let mut components = IndexMap::new();
        let schema = schema_for(&Shape::of::<serde_json::Value>(), &mut components);
        assert_eq!(schema, Schema::of(SchemaType::String));
    }

    #[test]
    fn inputs_become_request_body() {
        let mut components = IndexMap::new();
        let inputs = IndexMap::from([("application/json".to_owned(), DocIn::of::<User>().required(true))]);
        let body = translate_inputs(inputs, &mut components).unwrap();
        assert!(body.required);
        assert_eq!(body.content["application/json"].schema, Some(Schema::reference("User")));
        assert!(translate_inputs(IndexMap::new(), &mut components).is_none());
    }

    #[test]
    fn last_operation_wins_and_outputs_override_explicit_responses() {
        let mut reg = registry();
        register_operation(&mut reg, Method::Get, "/users", Docs::new().summary("first"));
        register_operation(
            &mut reg,
            Method::Get,
            "/users",
            Docs::new()
                .summary("second")
                .response("200", Response::new("explicit"))
                .response("404", Response::new("missing"))
                .output("200", DocOut::new("application/json", "translated").body::<Vec<User>>()),
        );

        let op = &reg.paths["/users"].operations[&Method::Get];
        assert_eq!(op.summary.as_deref(), Some("second"));
        assert_eq!(op.operation_id, "GETUsers");
        assert_eq!(op.responses["200"].description, "translated");
        assert_eq!(op.responses["404"].description, "missing");
    }

    #[test]
    fn operations_are_keyed_without_marker() {
        let mut reg = registry();
        register_operation(&mut reg, Method::Get, "/{$}", Docs::new());
        assert_eq!(reg.paths["/"].operations[&Method::Get].operation_id, "GETRoot");
    }

    #[test]
    fn options_allow_known_methods() {
        let mux = Mux::new();
        let mut reg = registry();
        reg.record_route(Method::Get, "/users");
        reg.record_route(Method::Post, "/users");

        synthesize_options(&mut reg, &mux);

        let mut w = Recorder::new();
        let mut req = Request::new(Method::Options, Uri::from_static("/users"));
        mux.serve(&mut w, &mut req);
        assert_eq!(w.status(), StatusCode::NO_CONTENT);
        assert_eq!(w.header("allow"), Some("GET, POST, OPTIONS"));
        assert!(w.body().is_empty());
        assert!(reg.paths["/users"].methods.contains(&Method::Options));
    }

    #[test]
    fn explicit_options_routes_are_left_alone() {
        let mux = Mux::new();
        let mut reg = registry();
        reg.record_route(Method::Options, "/cors");
        synthesize_options(&mut reg, &mux);

        let mut w = Recorder::new();
        mux.serve(&mut w, &mut Request::new(Method::Options, Uri::from_static("/cors")));
        assert_eq!(w.status(), StatusCode::NOT_FOUND);
    }
}
