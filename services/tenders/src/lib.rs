//! Tender service library crate.
//!
//! # Purpose
//! Exposes the tender model, versioned stores, HTTP API surface, and
//! configuration for use by the binary and tests.
//!
//! # Notes
//! Every change to a tender goes through a [`store::TenderStore`]; the HTTP
//! layer never edits fields itself.
pub mod api;
pub mod app;
pub mod config;
pub mod model;
pub mod observability;
pub mod store;
