//! Request synthesis: turn a declarative [`RequestSpec`] into the concrete
//! request handed to a sandboxed entrypoint.

use serde::{Deserialize, Serialize};

use crate::model::RequestSpec;

/// Host used for synthesized URLs. Never resolved or contacted.
pub const SYNTHETIC_ORIGIN: &str = "http://test";

/// Method used when a test does not name one.
pub const DEFAULT_METHOD: &str = "GET";

/// Methods the web `Request` constructor uppercases. Others pass through
/// with their original case.
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

/// A concrete request addressed to the sandboxed entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticRequest {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Build the request for a test case.
///
/// The path is appended to [`SYNTHETIC_ORIGIN`] untouched. Bodies are only
/// attached for methods that may carry one; a body on `GET`/`HEAD` would
/// make the web `Request` constructor throw.
pub fn synthesize(spec: &RequestSpec) -> SyntheticRequest {
    let method = spec
        .method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(normalize_method)
        .unwrap_or_else(|| DEFAULT_METHOD.to_string());

    let body = if accepts_body(&method) {
        spec.body.clone()
    } else {
        None
    };

    SyntheticRequest {
        url: format!("{SYNTHETIC_ORIGIN}{}", spec.path),
        method,
        body,
    }
}

fn normalize_method(method: &str) -> String {
    NORMALIZED_METHODS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(method))
        .map_or_else(|| method.to_string(), |known| known.to_string())
}

fn accepts_body(method: &str) -> bool {
    !matches!(method, "GET" | "HEAD")
}
