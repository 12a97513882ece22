//! Unified error type.

use thiserror::Error;

use crate::method::Method;

/// The error type returned by overmux's fallible operations.
///
/// Responses (404, 405, overrides) are never `Error`s; they are written to a
/// [`ResponseWriter`](crate::ResponseWriter). This type surfaces setup
/// mistakes (bad or colliding route patterns) and transport failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A `{method, pattern}` pair collides with an earlier registration.
    #[error("{method} {pattern} conflicts with an existing route")]
    RouteConflict { method: Method, pattern: String },

    /// A pattern the multiplexer cannot parse.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The API document could not be rendered as JSON.
    #[error("serialize openapi document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A router configuration document could not be parsed.
    #[error("invalid router config: {0}")]
    Config(#[source] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern { pattern: pattern.to_owned(), reason: reason.into() }
    }
}
