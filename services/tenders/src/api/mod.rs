//! Tender HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the shared query parsing helpers for
//! pagination and service-type filters.
pub mod error;
pub mod openapi;
pub mod system;
pub mod tenders;
pub mod types;

use crate::api::error::{ApiError, api_validation_error};
use crate::model::{ListPage, ServiceType};

/// Raw query pairs; keeps repeated keys such as `service_type`.
pub(crate) type QueryPairs = Vec<(String, String)>;

pub(crate) fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn query_u32(params: &[(String, String)], key: &str, default: u32) -> Result<u32, ApiError> {
    match query_value(params, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| api_validation_error(&format!("{key} must be a non-negative integer"))),
    }
}

pub(crate) fn parse_page(
    params: &[(String, String)],
    default_limit: u32,
) -> Result<ListPage, ApiError> {
    let limit = query_u32(params, "limit", default_limit)?;
    let offset = query_u32(params, "offset", 0)?;
    Ok(ListPage::new(limit, offset))
}

/// Every `service_type` value, in request order. Empty means no filter.
pub(crate) fn parse_service_types(
    params: &[(String, String)],
) -> Result<Vec<ServiceType>, ApiError> {
    params
        .iter()
        .filter(|(name, _)| name == "service_type")
        .map(|(_, value)| {
            value
                .parse::<ServiceType>()
                .map_err(|err| api_validation_error(&err.to_string()))
        })
        .collect()
}
