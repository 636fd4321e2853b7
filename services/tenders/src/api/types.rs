//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the public payload shapes of the tender REST API and their OpenAPI
//! schemas. Request bodies reuse the model input types directly.
use crate::model::{ServiceType, Tender, TenderStatus, TenderVersion};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

/// Public view of a tender without its version history.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenderResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TenderStatus,
    pub service_type: ServiceType,
    pub organization_id: String,
    pub author: String,
    pub version: u32,
    pub created_at: String,
}

impl From<&Tender> for TenderResponse {
    fn from(tender: &Tender) -> Self {
        Self {
            id: tender.id.clone(),
            name: tender.name.clone(),
            description: tender.description.clone(),
            status: tender.status,
            service_type: tender.service_type,
            organization_id: tender.organization_id.clone(),
            author: tender.author.clone(),
            version: tender.version,
            created_at: tender.created_at.clone(),
        }
    }
}

/// Tender plus every recorded version, oldest first.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TenderDetailResponse {
    #[serde(flatten)]
    pub tender: TenderResponse,
    pub versions: Vec<TenderVersion>,
}

impl From<Tender> for TenderDetailResponse {
    fn from(tender: Tender) -> Self {
        Self {
            tender: TenderResponse::from(&tender),
            versions: tender.versions.into_values().collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenderListResponse {
    pub items: Vec<TenderResponse>,
}

impl From<Vec<Tender>> for TenderListResponse {
    fn from(tenders: Vec<Tender>) -> Self {
        Self {
            items: tenders.iter().map(TenderResponse::from).collect(),
        }
    }
}
