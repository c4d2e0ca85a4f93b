//! Unified error handling for invgraph
//!
//! Domain errors are plain `thiserror` enums. Layers that can fail convert
//! into [`ApiError`] with `#[from]` where the conversion is lossless, and the
//! HTTP layer maps `ApiError` onto response statuses via [`ApiError::status`].

use thiserror::Error;

use crate::engine::EngineError;

/// Unified service error type.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// The payload does not follow the bulk interface.
    #[error("{0}")]
    BadRequest(String),

    /// A required field is missing from an action item.
    #[error("{0}")]
    MissingField(String),

    /// A resource path failed the URI encoding policy.
    #[error("invalid characters in uri={0}")]
    InvalidUriEncoding(String),

    /// A resource body could not be unmarshalled into a typed object.
    /// Carries the raw body for diagnostics.
    #[error("object could not be unmarshalled: {0}")]
    Unmarshal(String),

    /// A typed object failed the object-level validation pass.
    #[error("object validation failed: {0}")]
    Validation(String),

    /// No resource type could be resolved for a URI.
    #[error("resource type could not be resolved for uri={0}")]
    UnresolvableType(String),

    /// The request exceeds the configured operation limit.
    #[error("payload limit of {0} operations reached, please reduce payload")]
    LimitExceeded(usize),

    /// The graph engine failed fatally (begin/execute/commit/rollback).
    #[error("graph engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status carried by this error, used both for the top-level error
    /// envelope and for per-operation failure responses inside a bulk body.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_)
            | ApiError::MissingField(_)
            | ApiError::InvalidUriEncoding(_)
            | ApiError::Unmarshal(_)
            | ApiError::Validation(_)
            | ApiError::UnresolvableType(_)
            | ApiError::LimitExceeded(_) => 400,
            ApiError::Engine(_) | ApiError::Internal(_) => 500,
        }
    }
}

/// Unified result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(ApiError::BadRequest("bad".into()).status(), 400);
        assert_eq!(ApiError::MissingField("uri".into()).status(), 400);
        assert_eq!(ApiError::InvalidUriEncoding("/a b".into()).status(), 400);
        assert_eq!(ApiError::Unmarshal("{".into()).status(), 400);
        assert_eq!(ApiError::LimitExceeded(30).status(), 400);
    }

    #[test]
    fn server_errors_map_to_500() {
        assert_eq!(
            ApiError::Engine(EngineError::Backend("gone".into())).status(),
            500
        );
        assert_eq!(ApiError::Internal("boom".into()).status(), 500);
    }

    #[test]
    fn unmarshal_error_carries_raw_body() {
        let err = ApiError::Unmarshal("{\"broken\"".into());
        assert!(err.to_string().contains("{\"broken\""));
    }
}
