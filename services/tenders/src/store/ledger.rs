//! Backend-independent version ledger.
//!
//! # Purpose
//! Validates creation input and computes the next snapshot for a mutation.
//! Both backends call into this module so that field changes happen in exactly
//! one place; the backend only supplies the concurrency discipline around it.
//!
//! # Key invariants
//! - The next version is `version + 1` and must equal `recorded + 1`.
//! - Rollback copies name, description and service type from the target and
//!   keeps the live status.
//! - A missing rollback target is reported before anything is changed.
use super::{StoreError, StoreResult};
use crate::model::{NewTender, Tender, TenderEdit, TenderStatus, TenderVersion};
use anyhow::anyhow;
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Intended mutation of a tender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Status(TenderStatus),
    Edit(TenderEdit),
    Rollback(u32),
}

impl Change {
    pub fn op(&self) -> &'static str {
        match self {
            Change::Status(_) => "status",
            Change::Edit(_) => "edit",
            Change::Rollback(_) => "rollback",
        }
    }

    pub fn rollback_target(&self) -> Option<u32> {
        match self {
            Change::Rollback(target) => Some(*target),
            _ => None,
        }
    }
}

/// Build version 1 of a new tender, assigning its id and creation time.
pub fn validate_new(input: NewTender) -> StoreResult<Tender> {
    let name = required_text(input.name, "name")?;
    let description = input
        .description
        .ok_or_else(|| StoreError::Validation("description is required".into()))?;
    let service_type = input
        .service_type
        .ok_or_else(|| StoreError::Validation("serviceType is required".into()))?;
    let organization_id = required_text(input.organization_id, "organizationId")?;
    let author = required_text(input.author, "creatorUsername")?;

    let status = TenderStatus::Created;
    let mut versions = BTreeMap::new();
    versions.insert(
        1,
        TenderVersion {
            version: 1,
            name: name.clone(),
            description: description.clone(),
            service_type,
            status,
        },
    );
    Ok(Tender {
        id: Uuid::new_v4().to_string(),
        name,
        description,
        service_type,
        status,
        organization_id,
        author,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        version: 1,
        versions,
    })
}

fn required_text(value: Option<String>, field: &str) -> StoreResult<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(StoreError::Validation(format!("{field} is required"))),
    }
}

/// Version number the next snapshot will carry.
///
/// `recorded` is the number of stored snapshots; a pointer that disagrees with
/// it means the ledger is corrupt.
pub fn next_version(id: &str, version: u32, recorded: u64) -> StoreResult<u32> {
    if u64::from(version) != recorded {
        return Err(StoreError::Storage(anyhow!(
            "tender {id} points at version {version} but has {recorded} snapshots"
        )));
    }
    version
        .checked_add(1)
        .ok_or_else(|| StoreError::Storage(anyhow!("tender {id} version overflow")))
}

/// Compute snapshot `next` from the live fields.
///
/// `target` must be the stored snapshot named by a rollback change, or `None`
/// if the backend could not find it.
pub fn next_snapshot(
    id: &str,
    live: &TenderVersion,
    next: u32,
    change: &Change,
    target: Option<&TenderVersion>,
) -> StoreResult<TenderVersion> {
    let mut snapshot = TenderVersion {
        version: next,
        ..live.clone()
    };
    match change {
        Change::Status(status) => snapshot.status = *status,
        Change::Edit(edit) => {
            if let Some(name) = &edit.name {
                snapshot.name = name.clone();
            }
            if let Some(description) = &edit.description {
                snapshot.description = description.clone();
            }
            if let Some(service_type) = edit.service_type {
                snapshot.service_type = service_type;
            }
        }
        Change::Rollback(version) => {
            let Some(target) = target else {
                return Err(StoreError::NotFound(format!(
                    "tender {id} version {version}"
                )));
            };
            snapshot.name = target.name.clone();
            snapshot.description = target.description.clone();
            snapshot.service_type = target.service_type;
        }
    }
    Ok(snapshot)
}

/// Apply `change` to a fully loaded tender as one step.
///
/// Nothing is modified unless the whole step succeeds.
pub fn append(tender: &mut Tender, change: &Change) -> StoreResult<()> {
    let next = next_version(&tender.id, tender.version, tender.versions.len() as u64)?;
    let target = change
        .rollback_target()
        .and_then(|version| tender.versions.get(&version));
    let snapshot = next_snapshot(&tender.id, &tender.live_snapshot(), next, change, target)?;
    make_current(tender, snapshot);
    Ok(())
}

/// Install `snapshot` as the live state and record it in the ledger.
pub fn make_current(tender: &mut Tender, snapshot: TenderVersion) {
    tender.name = snapshot.name.clone();
    tender.description = snapshot.description.clone();
    tender.service_type = snapshot.service_type;
    tender.status = snapshot.status;
    tender.version = snapshot.version;
    tender.versions.insert(snapshot.version, snapshot);
}
