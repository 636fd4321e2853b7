//! Tender HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use crate::api;
use crate::observability;
use crate::store::TenderStore;
use axum::Router;
use axum::routing::{get, patch, post, put};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TenderStore>,
    /// Deadline applied to every store call made by a handler.
    pub op_timeout: Duration,
    pub default_page_limit: u32,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route("/api/ping", get(api::system::ping))
        .route("/api/tenders", get(api::tenders::list_tenders))
        .route("/api/tenders/new", post(api::tenders::create_tender))
        .route("/api/tenders/my", get(api::tenders::my_tenders))
        .route("/api/tenders/:tender_id", get(api::tenders::get_tender))
        .route(
            "/api/tenders/:tender_id/status",
            get(api::tenders::get_status).put(api::tenders::update_status),
        )
        .route(
            "/api/tenders/:tender_id/edit",
            patch(api::tenders::edit_tender),
        )
        .route(
            "/api/tenders/:tender_id/rollback/:version",
            put(api::tenders::rollback_tender),
        )
        .route("/api/openapi.json", get(api::openapi::openapi_json))
        .layer(trace_layer)
        .with_state(state)
}
