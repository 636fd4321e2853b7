//! Tender data model.
//!
//! # Purpose
//! Re-exports the tender record, its version snapshots, the closed enums, and
//! the input shapes accepted by the store and the HTTP API.
mod enums;
mod tender;

pub use enums::{ModelError, ServiceType, TenderStatus};
pub use tender::{ListPage, NewTender, Tender, TenderEdit, TenderVersion};
