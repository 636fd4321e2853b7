//! OpenAPI schema aggregation for the tender API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document served
//! at `/api/openapi.json`.
use crate::api::{
    system, tenders,
    types::{ErrorResponse, TenderDetailResponse, TenderListResponse, TenderResponse},
};
use crate::model::{NewTender, ServiceType, TenderEdit, TenderStatus, TenderVersion};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tenders",
        version = "v1",
        description = "Versioned tender management HTTP API"
    ),
    paths(
        system::ping,
        tenders::list_tenders,
        tenders::create_tender,
        tenders::my_tenders,
        tenders::get_tender,
        tenders::get_status,
        tenders::update_status,
        tenders::edit_tender,
        tenders::rollback_tender
    ),
    components(schemas(
        ErrorResponse,
        TenderResponse,
        TenderDetailResponse,
        TenderListResponse,
        TenderVersion,
        NewTender,
        TenderEdit,
        ServiceType,
        TenderStatus
    )),
    tags(
        (name = "system", description = "Liveness"),
        (name = "tenders", description = "Tender lifecycle and version history")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
