use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::engine::GraphEngine;

use super::{
    handlers::{bulk, health},
    middleware::logging,
    state::AppState,
};

pub fn create_router<E: GraphEngine + 'static>(
    state: AppState<E>,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/health", get(health::check))
        .route("/{version}/bulkadd", put(bulk::bulk_add::<E>))
        .route("/{version}/bulkprocess", put(bulk::bulk_process::<E>))
        .route(
            "/{version}/bulk/single-transaction",
            post(bulk::bulk_single::<E>),
        )
        .layer(middleware::from_fn(logging::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
