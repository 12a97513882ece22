//! State shared by every node of one router tree.
//!
//! One `Registry` sits behind the tree's `RwLock`. Registration takes the
//! write lock; request-time reads (status overrides, `Allow` lists, document
//! snapshots) take the read lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use http::StatusCode;
use indexmap::IndexMap;

use crate::config::RouterConfig;
use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::mux::EXACT_MARKER;
use crate::openapi::{Components, Info, OpenApi, Operation, PathItem, Schema, Server};

pub(crate) struct Registry {
    /// Keyed by the documented path: the routing pattern with `{$}` removed.
    pub(crate) paths: IndexMap<String, PathDescriptor>,
    pub(crate) status_handlers: HashMap<StatusCode, BoxedHandler>,
    pub(crate) schemas: IndexMap<String, Schema>,
    pub(crate) options_synthesized: bool,
    openapi_version: String,
    info: Info,
    servers: Vec<Server>,
}

pub(crate) struct PathDescriptor {
    /// The pattern the multiplexer knows this path by.
    pub(crate) pattern: String,
    pub(crate) methods: BTreeSet<Method>,
    pub(crate) operations: BTreeMap<Method, Operation>,
}

impl Registry {
    pub(crate) fn new(config: &RouterConfig) -> Self {
        Self {
            paths: IndexMap::new(),
            status_handlers: HashMap::new(),
            schemas: IndexMap::new(),
            options_synthesized: false,
            openapi_version: config.openapi_version.clone(),
            info: Info {
                title: config.title.clone(),
                version: config.version.clone(),
                description: config.description.clone(),
            },
            servers: Vec::new(),
        }
    }

    /// The descriptor for `pattern`, created on first use.
    pub(crate) fn descriptor(&mut self, pattern: &str) -> &mut PathDescriptor {
        self.paths.entry(documented_path(pattern)).or_insert_with(|| PathDescriptor {
            pattern: pattern.to_owned(),
            methods: BTreeSet::new(),
            operations: BTreeMap::new(),
        })
    }

    pub(crate) fn record_route(&mut self, method: Method, pattern: &str) {
        self.descriptor(pattern).methods.insert(method);
    }

    /// Methods registered for exactly `path`, in `Allow` order.
    pub(crate) fn methods_for(&self, path: &str) -> Vec<Method> {
        self.paths
            .get(path)
            .map(|d| d.methods.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn add_server(&mut self, url: String, description: Option<String>) {
        self.servers.push(Server { url, description });
    }

    /// A detached copy of the whole document.
    pub(crate) fn snapshot(&self) -> OpenApi {
        let paths = self
            .paths
            .iter()
            .filter(|(_, d)| !d.operations.is_empty())
            .map(|(path, d)| {
                let mut item = PathItem::default();
                for (method, op) in &d.operations {
                    if let Some(slot) = item.slot_mut(*method) {
                        *slot = Some(op.clone());
                    }
                }
                (path.clone(), item)
            })
            .collect();

        OpenApi {
            openapi: self.openapi_version.clone(),
            info: self.info.clone(),
            servers: self.servers.clone(),
            paths,
            components: Components { schemas: self.schemas.clone() },
        }
    }
}

/// Strips the exact-match marker: `/api/{$}` is documented as `/api/`.
pub(crate) fn documented_path(pattern: &str) -> String {
    pattern.replace(EXACT_MARKER, "")
}
