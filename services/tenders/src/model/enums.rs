//! Closed value sets for tenders.
//!
//! # Purpose
//! Defines the service-type and status enums together with their canonical
//! string forms, which are shared by the JSON API and the Postgres columns.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Rejected enum input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown service type: {0}")]
    UnknownServiceType(String),
    #[error("unknown status: {0}")]
    UnknownStatus(String),
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Construction,
    Delivery,
    Manufacture,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Construction,
        ServiceType::Delivery,
        ServiceType::Manufacture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Construction => "Construction",
            ServiceType::Delivery => "Delivery",
            ServiceType::Manufacture => "Manufacture",
        }
    }
}

impl FromStr for ServiceType {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ModelError::UnknownServiceType(value.to_string()))
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tender lifecycle status.
///
/// Any status may follow any other; only membership in this set is checked.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenderStatus {
    Created,
    Published,
    Closed,
}

impl TenderStatus {
    pub const ALL: [TenderStatus; 3] = [
        TenderStatus::Created,
        TenderStatus::Published,
        TenderStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Created => "Created",
            TenderStatus::Published => "Published",
            TenderStatus::Closed => "Closed",
        }
    }
}

impl FromStr for TenderStatus {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TenderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ModelError::UnknownStatus(value.to_string()))
    }
}

impl fmt::Display for TenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_strings_are_stable() {
        for kind in ServiceType::ALL {
            assert_eq!(kind.as_str().parse::<ServiceType>(), Ok(kind));
        }
        assert_eq!(
            "construction".parse::<ServiceType>(),
            Err(ModelError::UnknownServiceType("construction".to_string()))
        );
    }

    #[test]
    fn status_parse_rejects_values_outside_the_set() {
        assert_eq!("Published".parse::<TenderStatus>(), Ok(TenderStatus::Published));
        let err = "Archived".parse::<TenderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown status: Archived");
    }

    #[test]
    fn enums_serialize_as_variant_names() {
        let json = serde_json::to_string(&TenderStatus::Closed).expect("json");
        assert_eq!(json, "\"Closed\"");
        let kind: ServiceType = serde_json::from_str("\"Delivery\"").expect("parse");
        assert_eq!(kind, ServiceType::Delivery);
    }
}
