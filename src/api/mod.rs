//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::http::HeaderName;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::ledger::LedgerEngine;
use crate::store::LedgerStore;

pub use routes::create_router;

/// Build the full application: `/health` plus the ledger API under `/api/v1`
pub fn build_app<S: LedgerStore>(engine: Arc<LedgerEngine<S>>) -> Router {
    let request_id = HeaderName::from_static(middleware::REQUEST_ID_HEADER);

    // Order: request id -> trace -> logging -> handler
    let api_routes = create_router::<S>().layer(axum::middleware::from_fn(
        middleware::logging_middleware,
    ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .with_state(engine)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
