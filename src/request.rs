//! Framework-agnostic view of an incoming actuator request.

use axum::http::{HeaderMap, Uri};

/// Incoming request as seen by the dispatcher, handlers and health checks.
#[derive(Debug, Clone, Default)]
pub struct ActuatorRequest {
    /// Request path, without query string.
    pub path: String,
    /// Decoded query parameters in the order they appeared.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
}

impl ActuatorRequest {
    /// Create a request for the given path with no query or headers.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build a request from a URI, decoding its query string.
    pub fn from_uri(uri: &Uri, headers: HeaderMap) -> Self {
        let query = uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: uri.path().to_string(),
            query,
            headers,
        }
    }

    /// Add a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// First value of a query parameter, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
