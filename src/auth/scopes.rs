//! Static route-to-scope table.

use axum::http::Method;

pub const READ: &str = "read.real-estate-post";
pub const WRITE: &str = "write.real-estate-post";

/// A single `"<METHOD> <path-prefix>"` pattern and the scope it demands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRule {
    pub pattern: String,
    pub scope: String,
}

/// Insertion-ordered rule list. The first rule whose pattern occurs in the
/// request key is authoritative.
#[derive(Debug, Clone)]
pub struct ScopeTable {
    rules: Vec<ScopeRule>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new(vec![
            ("GET /v1/real-estate-listing/", READ),
            ("POST /v1/real-estate-listing/", WRITE),
            ("PATCH /v1/real-estate-listing/", WRITE),
            ("DELETE /v1/real-estate-listing/", WRITE),
        ])
    }
}

impl ScopeTable {
    pub fn new<P: Into<String>, S: Into<String>>(rules: Vec<(P, S)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(pattern, scope)| ScopeRule {
                    pattern: pattern.into(),
                    scope: scope.into(),
                })
                .collect(),
        }
    }

    /// Resolve the scope a request needs, or `None` if no rule covers it.
    pub fn required_scope(&self, method: &Method, path: &str) -> Option<&str> {
        let key = request_key(method, path);
        self.rules
            .iter()
            .find(|rule| key.contains(rule.pattern.as_str()))
            .map(|rule| rule.scope.as_str())
    }
}

/// `"<METHOD> <path>/"`, with any run of trailing slashes collapsed to one.
fn request_key(method: &Method, path: &str) -> String {
    format!("{} {}/", method.as_str(), path.trim_end_matches('/'))
}
