use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::core::ApiError;

#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        match err.status() {
            400 => HttpError::BadRequest(err.to_string()),
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_onto_http_variants() {
        let bad = HttpError::from(ApiError::BadRequest("nope".into()));
        assert!(matches!(bad, HttpError::BadRequest(_)));
        let fatal = HttpError::from(ApiError::Internal("boom".into()));
        assert!(matches!(fatal, HttpError::InternalError(_)));
    }
}
