//! Tender records and their version snapshots.
//!
//! # Purpose
//! A [`Tender`] carries its live fields plus the full, append-only map of
//! [`TenderVersion`] snapshots. Only the store ledger mutates these values;
//! callers describe changes with [`NewTender`] and [`TenderEdit`].
//!
//! # Invariants
//! - `versions` keys are exactly `1..=version`.
//! - `versions[version]` mirrors the live name, description, service type and status.
//! - `id`, `organization_id`, `author` and `created_at` never change after creation.
use super::{ServiceType, TenderStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    pub id: String,
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub status: TenderStatus,
    pub organization_id: String,
    pub author: String,
    /// RFC 3339, UTC, second precision.
    pub created_at: String,
    pub version: u32,
    #[schema(value_type = Object)]
    pub versions: BTreeMap<u32, TenderVersion>,
}

impl Tender {
    /// Snapshot of the live fields, tagged with the current version.
    pub fn live_snapshot(&self) -> TenderVersion {
        TenderVersion {
            version: self.version,
            name: self.name.clone(),
            description: self.description.clone(),
            service_type: self.service_type,
            status: self.status,
        }
    }

    pub fn current_snapshot(&self) -> Option<&TenderVersion> {
        self.versions.get(&self.version)
    }
}

/// Immutable capture of a tender's content when a version became current.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenderVersion {
    pub version: u32,
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub status: TenderStatus,
}

/// Creation input. Every field is optional on the wire so that absence can be
/// reported as a validation failure instead of a decode failure.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewTender {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<ServiceType>,
    pub organization_id: Option<String>,
    #[serde(rename = "creatorUsername")]
    pub author: Option<String>,
}

/// Field changes for an edit. Unset fields keep their current value.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenderEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<ServiceType>,
}

impl TenderEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.service_type.is_none()
    }
}

/// Offset/limit window applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPage {
    pub limit: u32,
    pub offset: u32,
}

impl ListPage {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    pub fn window<I: Iterator>(&self, items: I) -> impl Iterator<Item = I::Item> {
        items.skip(self.offset as usize).take(self.limit as usize)
    }
}
