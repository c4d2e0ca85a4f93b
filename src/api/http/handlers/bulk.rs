//! Bulk endpoints
//!
//! `PUT /{version}/bulkadd` accepts only `put` action blocks;
//! `PUT /{version}/bulkprocess` accepts `put`, `delete`, and `patch`.
//! Both return a fixed `201 Created` with the aggregated payload whenever
//! the envelope itself is valid; per-operation status lives inside the body.
//!
//! `POST /{version}/bulk/single-transaction` carries one transaction whose
//! outcome decides the outer status instead.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use http::StatusCode;
use serde_json::json;
use tokio::task;
use uuid::Uuid;

use crate::api::http::{error::HttpError, state::AppState};
use crate::bulk::{ActionMask, RequestContext, SingleOutcome};
use crate::engine::GraphEngine;
use crate::schema::MediaType;

pub async fn bulk_add<E: GraphEngine + 'static>(
    State(state): State<AppState<E>>,
    Path(version): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    handle(state, version, headers, body, ActionMask::ADD_ONLY, "bulk add").await
}

pub async fn bulk_process<E: GraphEngine + 'static>(
    State(state): State<AppState<E>>,
    Path(version): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    handle(
        state,
        version,
        headers,
        body,
        ActionMask::PROCESS,
        "bulk process",
    )
    .await
}

pub async fn bulk_single<E: GraphEngine + 'static>(
    State(state): State<AppState<E>>,
    Path(version): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !version_supported(&version) {
        return HttpError::BadRequest(format!("unsupported version: {version}")).into_response();
    }
    if !media_type_supported(&headers) {
        return HttpError::BadRequest("unsupported media type, expected application/json".into())
            .into_response();
    }

    let ctx = request_context(&headers);
    let result = task::spawn_blocking(move || state.pipeline.process_single(&body, &ctx)).await;

    match result {
        Ok(Ok(SingleOutcome::Committed(payload))) => {
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Ok(Ok(SingleOutcome::RolledBack { status, message })) => {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({"error": message, "status": status.as_u16()})),
            )
                .into_response()
        }
        Ok(Err(err)) => HttpError::from(err).into_response(),
        Err(join_err) => {
            HttpError::InternalError(format!("bulk task failed: {join_err}")).into_response()
        }
    }
}

async fn handle<E: GraphEngine + 'static>(
    state: AppState<E>,
    version: String,
    headers: HeaderMap,
    body: String,
    allowed: ActionMask,
    module: &'static str,
) -> Response {
    if !version_supported(&version) {
        return HttpError::BadRequest(format!("unsupported version: {version}")).into_response();
    }
    if !media_type_supported(&headers) {
        return HttpError::BadRequest("unsupported media type, expected application/json".into())
            .into_response();
    }

    let ctx = request_context(&headers);
    let result = task::spawn_blocking(move || {
        state.pipeline.process(&body, &ctx, allowed, module)
    })
    .await;

    match result {
        Ok(Ok(payload)) => (StatusCode::CREATED, Json(payload)).into_response(),
        Ok(Err(err)) => HttpError::from(err).into_response(),
        Err(join_err) => {
            HttpError::InternalError(format!("bulk task failed: {join_err}")).into_response()
        }
    }
}

fn version_supported(version: &str) -> bool {
    if version == "latest" {
        return true;
    }
    match version.strip_prefix('v') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn media_type_supported(headers: &HeaderMap) -> bool {
    match headers.get(http::header::CONTENT_TYPE) {
        Some(value) => value
            .to_str()
            .map(|v| v.contains("json") || v.contains("*/*"))
            .unwrap_or(false),
        // Absent content type defaults to JSON.
        None => true,
    }
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RequestContext {
        correlation_id: header("X-TransactionId")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        source_of_truth: header("X-FromAppId"),
        real_time: header("Real-Time").is_some_and(|v| !v.is_empty()),
        override_limit: header("X-OverrideLimit"),
        media_type: MediaType::Json,
    }
}
