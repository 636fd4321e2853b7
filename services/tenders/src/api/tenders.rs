//! Tender API handlers.
//!
//! # Purpose
//! Implements listing, creation, lookup, status changes, edits and rollback of
//! tenders. Handlers only translate HTTP input into store intents; every field
//! change happens inside the store.
//!
//! # Notes
//! Each store call runs under the configured operation deadline.
use crate::api::error::{
    ApiError, api_not_found, api_unauthorized, api_validation_error, from_store,
};
use crate::api::types::{TenderDetailResponse, TenderListResponse, TenderResponse};
use crate::api::{QueryPairs, parse_page, parse_service_types, query_value};
use crate::app::AppState;
use crate::model::{NewTender, ServiceType, TenderEdit, TenderStatus};
use crate::store::{StoreError, within};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| api_validation_error(&rejection.body_text()))
}

#[utoipa::path(
    get,
    path = "/api/tenders",
    tag = "tenders",
    params(
        ("limit" = Option<u32>, Query, description = "Page size"),
        ("offset" = Option<u32>, Query, description = "Items to skip after filtering"),
        ("service_type" = Option<Vec<ServiceType>>, Query, description = "Repeatable service type filter")
    ),
    responses(
        (status = 200, description = "Tenders in creation order", body = TenderListResponse),
        (status = 400, description = "Invalid query", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_tenders(
    State(state): State<AppState>,
    Query(params): Query<QueryPairs>,
) -> Result<Json<TenderListResponse>, ApiError> {
    let page = parse_page(&params, state.default_page_limit)?;
    let filter = parse_service_types(&params)?;
    let tenders = within(state.op_timeout, state.store.list_page(page, &filter))
        .await
        .map_err(|err| from_store("failed to list tenders", err))?;
    Ok(Json(tenders.into()))
}

#[utoipa::path(
    post,
    path = "/api/tenders/new",
    tag = "tenders",
    request_body = NewTender,
    responses(
        (status = 201, description = "Tender created", body = TenderResponse),
        (status = 400, description = "Missing or invalid field", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_tender(
    State(state): State<AppState>,
    payload: Result<Json<NewTender>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = json_body(payload)?;
    let created = within(state.op_timeout, state.store.create(input))
        .await
        .map_err(|err| from_store("failed to create tender", err))?;
    tracing::info!(tender_id = %created.id, author = %created.author, "tender created");
    Ok((StatusCode::CREATED, Json(TenderResponse::from(&created))))
}

#[utoipa::path(
    get,
    path = "/api/tenders/my",
    tag = "tenders",
    params(
        ("username" = String, Query, description = "Author whose tenders are listed"),
        ("limit" = Option<u32>, Query, description = "Page size"),
        ("offset" = Option<u32>, Query, description = "Items to skip")
    ),
    responses(
        (status = 200, description = "Tenders created by the user", body = TenderListResponse),
        (status = 400, description = "Invalid query", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unknown user", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn my_tenders(
    State(state): State<AppState>,
    Query(params): Query<QueryPairs>,
) -> Result<Json<TenderListResponse>, ApiError> {
    let page = parse_page(&params, state.default_page_limit)?;
    let username = query_value(&params, "username")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| api_validation_error("username is required"))?;
    let known = within(state.op_timeout, state.store.has_author(username))
        .await
        .map_err(|err| from_store("failed to look up user", err))?;
    if !known {
        return Err(api_unauthorized("user has no tenders"));
    }
    let tenders = within(state.op_timeout, state.store.list_by_author(page, username))
        .await
        .map_err(|err| from_store("failed to list tenders", err))?;
    Ok(Json(tenders.into()))
}

#[utoipa::path(
    get,
    path = "/api/tenders/{tender_id}",
    tag = "tenders",
    params(("tender_id" = String, Path, description = "Tender identifier")),
    responses(
        (status = 200, description = "Tender with its version history", body = TenderDetailResponse),
        (status = 404, description = "Tender not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_tender(
    Path(tender_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TenderDetailResponse>, ApiError> {
    let tender = within(state.op_timeout, state.store.get(&tender_id))
        .await
        .map_err(|err| from_store("failed to fetch tender", err))?
        .ok_or_else(|| api_not_found("tender not found"))?;
    Ok(Json(tender.into()))
}

#[utoipa::path(
    get,
    path = "/api/tenders/{tender_id}/status",
    tag = "tenders",
    params(("tender_id" = String, Path, description = "Tender identifier")),
    responses(
        (status = 200, description = "Current status", body = TenderStatus),
        (status = 404, description = "Tender not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_status(
    Path(tender_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TenderStatus>, ApiError> {
    let tender = within(state.op_timeout, state.store.get(&tender_id))
        .await
        .map_err(|err| from_store("failed to fetch tender", err))?
        .ok_or_else(|| api_not_found("tender not found"))?;
    Ok(Json(tender.status))
}

#[utoipa::path(
    put,
    path = "/api/tenders/{tender_id}/status",
    tag = "tenders",
    params(
        ("tender_id" = String, Path, description = "Tender identifier"),
        ("status" = TenderStatus, Query, description = "New status")
    ),
    responses(
        (status = 200, description = "Status updated", body = TenderResponse),
        (status = 400, description = "Missing or unknown status", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Tender not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_status(
    Path(tender_id): Path<String>,
    State(state): State<AppState>,
    Query(params): Query<QueryPairs>,
) -> Result<Json<TenderResponse>, ApiError> {
    let status = query_value(&params, "status")
        .ok_or_else(|| api_validation_error("status is required"))?
        .parse::<TenderStatus>()
        .map_err(|err| from_store("invalid status", StoreError::from(err)))?;
    let updated = within(state.op_timeout, state.store.update_status(&tender_id, status))
        .await
        .map_err(|err| from_store("failed to update tender status", err))?;
    Ok(Json(TenderResponse::from(&updated)))
}

#[utoipa::path(
    patch,
    path = "/api/tenders/{tender_id}/edit",
    tag = "tenders",
    params(("tender_id" = String, Path, description = "Tender identifier")),
    request_body = TenderEdit,
    responses(
        (status = 200, description = "Tender edited", body = TenderResponse),
        (status = 400, description = "Invalid body", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Tender not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn edit_tender(
    Path(tender_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<TenderEdit>, JsonRejection>,
) -> Result<Json<TenderResponse>, ApiError> {
    let edit = json_body(payload)?;
    let updated = within(state.op_timeout, state.store.edit(&tender_id, edit))
        .await
        .map_err(|err| from_store("failed to edit tender", err))?;
    Ok(Json(TenderResponse::from(&updated)))
}

#[utoipa::path(
    put,
    path = "/api/tenders/{tender_id}/rollback/{version}",
    tag = "tenders",
    params(
        ("tender_id" = String, Path, description = "Tender identifier"),
        ("version" = u32, Path, description = "Version whose content is restored")
    ),
    responses(
        (status = 200, description = "Rolled back into a new version", body = TenderResponse),
        (status = 400, description = "Invalid version", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Tender or version not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn rollback_tender(
    Path((tender_id, version)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<TenderResponse>, ApiError> {
    let target = version
        .parse::<u32>()
        .map_err(|_| api_validation_error("version must be a non-negative integer"))?;
    let updated = within(state.op_timeout, state.store.rollback(&tender_id, target))
        .await
        .map_err(|err| from_store("failed to roll back tender", err))?;
    Ok(Json(TenderResponse::from(&updated)))
}
