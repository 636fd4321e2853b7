//! Liveness API handler.
//!
//! # Purpose and responsibility
//! Provides the `/api/ping` probe, which checks the backing store and answers
//! `ok` when it is reachable.
//!
//! # Key invariants and assumptions
//! - The probe must be fast and side-effect free.
use crate::api::error::{ApiError, from_store};
use crate::app::AppState;
use crate::store::within;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/api/ping",
    tag = "system",
    responses(
        (status = 200, description = "Service and storage are reachable", body = String),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse),
        (status = 504, description = "Storage did not answer in time", body = crate::api::types::ErrorResponse)
    )
)]
/// Probe the backing store and return `ok` if healthy.
pub(crate) async fn ping(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    within(state.op_timeout, state.store.health_check())
        .await
        .map_err(|err| from_store("storage unavailable", err))?;
    Ok("ok")
}
