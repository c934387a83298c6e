//! Resource path and query-string construction.
//!
//! Option records describe their query parameters through `QueryParams`;
//! `url_with_options` turns a resource path and an optional record into
//! `path[?query]`. Fields left at their default value produce no pair, and
//! list fields repeat their key once per element.

use url::form_urlencoded;

use crate::error::ApiError;

pub type QueryParam = (&'static str, String);

/// A record that can be encoded into query parameters.
pub trait QueryParams {
    /// Key/value pairs in emission order, default values already omitted.
    fn query_pairs(&self) -> Vec<QueryParam>;
}

/// Builds a request path with an encoded query string.
///
/// `path` must be absolute and must not already carry a query or fragment.
pub fn url_with_options(
    path: &str,
    options: Option<&dyn QueryParams>,
) -> Result<String, ApiError> {
    if !path.starts_with('/') {
        return Err(ApiError::InvalidUrl(format!("path must be absolute: {path:?}")));
    }
    if path.contains(['?', '#']) {
        return Err(ApiError::InvalidUrl(format!(
            "path must not contain a query or fragment: {path:?}"
        )));
    }

    let pairs = options.map(|o| o.query_pairs()).unwrap_or_default();
    if pairs.is_empty() {
        return Ok(path.to_string());
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    Ok(format!("{path}?{query}"))
}

/// `/<resource>/<id>` or `/<resource>/<id>/<action>`. Identifiers are
/// positive; zero is rejected before any request is built.
pub(crate) fn resource_path(
    resource: &str,
    id: u64,
    action: Option<&str>,
) -> Result<String, ApiError> {
    if id == 0 {
        return Err(ApiError::Validation(format!("{resource} id must be positive")));
    }
    Ok(match action {
        Some(action) => format!("/{resource}/{id}/{action}"),
        None => format!("/{resource}/{id}"),
    })
}

/// Percent-encodes a value so it fits in a single path segment. A `/`
/// becomes `%2F`, which is how repository slugs are addressed.
pub fn encode_segment(value: &str) -> String {
    // byte_serialize escapes a literal '+' as %2B, so every '+' left in the
    // output stands for a space.
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
