//! URI to query resolution
//!
//! Resource paths follow the container/key convention: the segment before the
//! resource key names the resource type (`/network/pservers/pserver/ps-1`
//! resolves to type `pserver`). Relationship sub-resources resolve to the
//! fixed `relationship` type.

use std::collections::BTreeMap;

use crate::bulk::RELATIONSHIP_SUFFIX;
use crate::core::{ApiError, ApiResult};

pub const RELATIONSHIP_TYPE: &str = "relationship";

/// Query parameters, ordered for stable request logging.
pub type QueryParams = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub path: String,
    pub result_type: String,
    pub params: QueryParams,
}

impl QueryDescriptor {
    pub fn new(path: String, result_type: String) -> Self {
        Self {
            path,
            result_type,
            params: QueryParams::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UriResolver;

impl UriResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a resource path into a query descriptor carrying the result
    /// type. Fails when the path is too shallow to name a resource.
    pub fn resolve(&self, path: &str, params: &QueryParams) -> ApiResult<QueryDescriptor> {
        if path.ends_with(RELATIONSHIP_SUFFIX) {
            return Ok(QueryDescriptor {
                path: path.to_string(),
                result_type: RELATIONSHIP_TYPE.to_string(),
                params: params.clone(),
            });
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return Err(ApiError::UnresolvableType(path.to_string()));
        }
        Ok(QueryDescriptor {
            path: path.to_string(),
            result_type: segments[segments.len() - 2].to_string(),
            params: params.clone(),
        })
    }
}

/// Split a raw URI into its path and parsed query parameters.
pub fn split_uri(raw: &str) -> (String, QueryParams) {
    let mut params = QueryParams::new();
    let (path, query) = match raw.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (raw, None),
    };
    if let Some(query) = query {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
    }
    (path.to_string(), params)
}

/// Encoding policy for resource paths: ASCII, no whitespace, reserved and
/// unreserved URI characters only, percent escapes well-formed.
pub fn validate_encoding(path: &str) -> bool {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'%' => {
                if i + 2 >= bytes.len()
                    || !bytes[i + 1].is_ascii_hexdigit()
                    || !bytes[i + 2].is_ascii_hexdigit()
                {
                    return false;
                }
                i += 3;
                continue;
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => {}
            b'-' | b'.' | b'_' | b'~' => {}
            b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=' => {}
            b':' | b'@' | b'/' => {}
            _ => return false,
        }
        i += 1;
    }
    true
}
