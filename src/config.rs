//! Router configuration.

use http::StatusCode;
use serde::Deserialize;
use tracing::warn;

use crate::error::Error;

/// Construction-time settings for a [`Router`](crate::Router).
///
/// Every field but `title` and `version` has a default, so a minimal JSON
/// document is enough:
///
/// ```rust
/// use overmux::RouterConfig;
///
/// let config = RouterConfig::from_json(r#"{"title": "Example API", "version": "1.0.0"}"#).unwrap();
/// assert!(!config.docs_enabled);
/// assert_eq!(config.redirect_status, 307);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    pub title: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_openapi_version")]
    pub openapi_version: String,
    #[serde(default)]
    pub docs_enabled: bool,
    #[serde(default)]
    pub redirect_trailing_slash: bool,
    #[serde(default = "default_redirect_status")]
    pub redirect_status: u16,
    /// Request bodies larger than this are answered with `413`.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_openapi_version() -> String {
    "3.0.1".to_owned()
}

fn default_redirect_status() -> u16 {
    StatusCode::TEMPORARY_REDIRECT.as_u16()
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

impl RouterConfig {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            openapi_version: default_openapi_version(),
            docs_enabled: false,
            redirect_trailing_slash: false,
            redirect_status: default_redirect_status(),
            max_body_size: default_max_body_size(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::Config)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = version.into();
        self
    }

    pub fn docs_enabled(mut self, enabled: bool) -> Self {
        self.docs_enabled = enabled;
        self
    }

    pub fn redirect_trailing_slash(mut self, redirect: bool) -> Self {
        self.redirect_trailing_slash = redirect;
        self
    }

    pub fn redirect_status(mut self, status: StatusCode) -> Self {
        self.redirect_status = status.as_u16();
        self
    }

    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// The configured redirect status, or `307` when it is not a 3xx code.
    pub(crate) fn resolved_redirect_status(&self) -> StatusCode {
        match StatusCode::from_u16(self.redirect_status) {
            Ok(status) if status.is_redirection() => status,
            _ => {
                warn!(configured = self.redirect_status, "redirect_status is not a redirection, using 307");
                StatusCode::TEMPORARY_REDIRECT
            }
        }
    }
}
