//! Radix-tree request multiplexer.
//!
//! One tree per HTTP method, O(path-length) lookup. The multiplexer knows
//! nothing about groups, middleware, documentation or custom error pages. It
//! answers unmatched requests with fixed plain-text 404 and 405 responses,
//! and [`Router`](crate::Router) layers everything else on top without
//! changing it.
//!
//! # Pattern syntax
//!
//! | Pattern | Matches |
//! |---|---|
//! | `/users` | exactly `/users` |
//! | `/users/{id}` | `/users/42`, binding `id = "42"` |
//! | `/files/{path...}` | `/files/a/b.txt`, binding `path = "a/b.txt"` |
//! | `/static/` | `/static/` and everything below it |
//! | `/static/{$}` | exactly `/static/` |
//! | `/` | every path (the catch-all prefix) |
//! | `/{$}` | exactly `/` |
//!
//! `GET` routes also answer `HEAD`. Registering the same pattern twice for a
//! method is an [`Error::RouteConflict`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use http::header::ALLOW;
use http::{HeaderValue, StatusCode};
use matchit::{InsertError, Router as MatchitRouter};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::request::Request;
use crate::response::write_error;
use crate::writer::ResponseWriter;

/// The exact-match marker segment.
pub(crate) const EXACT_MARKER: &str = "{$}";

/// Request multiplexer with fixed not-found and method-not-allowed replies.
///
/// Registration and lookup may interleave across threads.
#[derive(Default)]
pub struct Mux {
    tables: RwLock<BTreeMap<Method, MethodTable>>,
}

#[derive(Default)]
struct MethodTable {
    exact: MatchitRouter<BoxedHandler>,
    prefixes: Vec<PrefixRoute>,
}

/// A pattern ending in `/`: matches that path and everything under it.
struct PrefixRoute {
    segments: Vec<Segment>,
    handler: BoxedHandler,
}

enum Segment {
    Static(String),
    Param(String),
}

enum Parsed {
    Exact(String),
    Prefix(Vec<Segment>),
}

enum Lookup {
    Found(BoxedHandler, HashMap<String, String>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + pattern pair.
    pub fn handle(&self, method: Method, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        let parsed = parse(pattern)?;
        let mut tables = self.tables.write();
        let table = tables.entry(method).or_default();
        match parsed {
            Parsed::Exact(route) => table.exact.insert(route, handler).map_err(|e| match e {
                InsertError::Conflict { .. } => Error::RouteConflict { method, pattern: pattern.to_owned() },
                other => Error::invalid_pattern(pattern, other.to_string()),
            })?,
            Parsed::Prefix(segments) => {
                if table.prefixes.iter().any(|p| same_shape(&p.segments, &segments)) {
                    return Err(Error::RouteConflict { method, pattern: pattern.to_owned() });
                }
                table.prefixes.push(PrefixRoute { segments, handler });
            }
        }
        debug!(%method, pattern, "mux route added");
        Ok(())
    }

    /// Dispatches `req`, binding path parameters on it first.
    pub fn serve(&self, w: &mut dyn ResponseWriter, req: &mut Request) {
        let lookup = {
            let tables = self.tables.read();
            lookup(&tables, Method::from_http(req.method()), req.path())
        };

        match lookup {
            Lookup::Found(handler, params) => {
                req.set_params(params);
                handler.serve(w, req);
            }
            Lookup::MethodNotAllowed(allowed) => {
                if let Ok(v) = HeaderValue::from_str(&Method::join(allowed)) {
                    w.headers_mut().insert(ALLOW, v);
                }
                write_error(w, "Method Not Allowed", StatusCode::METHOD_NOT_ALLOWED);
            }
            Lookup::NotFound => write_error(w, "404 page not found", StatusCode::NOT_FOUND),
        }
    }
}

fn lookup(tables: &BTreeMap<Method, MethodTable>, method: Option<Method>, path: &str) -> Lookup {
    if let Some(method) = method {
        let mut candidates = vec![method];
        if method == Method::Head {
            candidates.push(Method::Get);
        }
        for m in candidates {
            if let Some(found) = tables.get(&m).and_then(|t| t.find(path)) {
                return Lookup::Found(found.0, found.1);
            }
        }
    }

    let mut allowed = Vec::new();
    for (m, table) in tables {
        if table.find(path).is_some() {
            allowed.push(*m);
            if *m == Method::Get {
                allowed.push(Method::Head);
            }
        }
    }
    allowed.sort();
    allowed.dedup();

    if allowed.is_empty() { Lookup::NotFound } else { Lookup::MethodNotAllowed(allowed) }
}

impl MethodTable {
    fn find(&self, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        if let Ok(matched) = self.exact.at(path) {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Some((Arc::clone(matched.value), params));
        }

        // Longest prefix wins.
        self.prefixes
            .iter()
            .filter_map(|p| p.matches(path).map(|params| (p, params)))
            .max_by_key(|(p, _)| p.segments.len())
            .map(|(p, params)| (Arc::clone(&p.handler), params))
    }
}

impl PrefixRoute {
    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut rest = path.strip_prefix('/')?;
        let mut params = HashMap::new();
        for segment in &self.segments {
            let (head, tail) = rest.split_once('/')?;
            match segment {
                Segment::Static(s) if s == head => {}
                Segment::Param(name) if !head.is_empty() => {
                    params.insert(name.clone(), head.to_owned());
                }
                _ => return None,
            }
            rest = tail;
        }
        Some(params)
    }
}

/// Prefix routes collide when they differ only in parameter names.
fn same_shape(a: &[Segment], b: &[Segment]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Segment::Static(x), Segment::Static(y)) => x == y,
            (Segment::Param(_), Segment::Param(_)) => true,
            _ => false,
        })
}

fn parse(pattern: &str) -> Result<Parsed, Error> {
    let Some(body) = pattern.strip_prefix('/') else {
        return Err(Error::invalid_pattern(pattern, "must start with `/`"));
    };

    let parts: Vec<&str> = body.split('/').collect();
    let last = parts.len() - 1;
    let mut route = String::with_capacity(pattern.len());
    let mut segments = Vec::new();
    let mut exact_marker = false;

    for (i, part) in parts.iter().enumerate() {
        if *part == EXACT_MARKER {
            if i != last {
                return Err(Error::invalid_pattern(pattern, "`{$}` must be the final segment"));
            }
            exact_marker = true;
            route.push('/');
            break;
        }

        route.push('/');
        if let Some(name) = wildcard_name(part) {
            let name = name.map_err(|reason| Error::invalid_pattern(pattern, reason))?;
            if let Some(rest) = name.strip_suffix("...") {
                if i != last {
                    return Err(Error::invalid_pattern(pattern, "`{name...}` must be the final segment"));
                }
                if rest.is_empty() {
                    return Err(Error::invalid_pattern(pattern, "empty wildcard name"));
                }
                route.push_str(&format!("{{*{rest}}}"));
                return Ok(Parsed::Exact(route));
            }
            route.push_str(&format!("{{{name}}}"));
            segments.push(Segment::Param(name.to_owned()));
        } else {
            route.push_str(part);
            if !part.is_empty() {
                segments.push(Segment::Static((*part).to_owned()));
            }
        }
    }

    if exact_marker || !route.ends_with('/') {
        return Ok(Parsed::Exact(route));
    }
    Ok(Parsed::Prefix(segments))
}

/// `Some(Ok(name))` for a `{name}` segment, `Some(Err(_))` for a malformed
/// one, `None` for a literal segment.
fn wildcard_name(part: &str) -> Option<Result<&str, &'static str>> {
    if !part.contains(['{', '}']) {
        return None;
    }
    let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
        return Some(Err("a wildcard must be a whole segment"));
    };
    if name.is_empty() {
        return Some(Err("empty wildcard name"));
    }
    if name.contains(['{', '}', '$']) {
        return Some(Err("bad wildcard name"));
    }
    Some(Ok(name))
}
