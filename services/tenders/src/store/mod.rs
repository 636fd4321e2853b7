//! Versioned tender storage.
//!
//! # Purpose
//! Defines the [`TenderStore`] contract shared by the in-memory and Postgres
//! backends, the typed [`StoreError`], and the [`within`] deadline helper.
//!
//! # Key invariants
//! - Every successful mutation appends exactly one version snapshot.
//! - A failed mutation leaves no observable change.
//! - Lists are filtered first and then windowed by offset/limit, in insertion order.
use crate::model::{ListPage, ModelError, NewTender, ServiceType, Tender, TenderEdit, TenderStatus};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub mod ledger;
pub mod memory;
pub mod postgres;
#[cfg(test)]
mod postgres_tests;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound on row-lock waits inside a Postgres transaction.
    pub lock_timeout: Duration,
    /// Upper bound on any single statement inside a Postgres transaction.
    pub statement_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(crate::config::DEFAULT_LOCK_TIMEOUT_MS),
            statement_timeout: Duration::from_millis(crate::config::DEFAULT_OP_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl StoreError {
    /// Stable label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Validation(_) => "validation",
            StoreError::DeadlineExceeded => "deadline_exceeded",
            StoreError::Storage(_) => "storage",
        }
    }

    /// Deadline expiry belongs to the storage failure category.
    pub fn is_storage(&self) -> bool {
        matches!(self, StoreError::Storage(_) | StoreError::DeadlineExceeded)
    }
}

impl From<ModelError> for StoreError {
    fn from(err: ModelError) -> Self {
        StoreError::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Storage(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TenderStore: Send + Sync {
    async fn create(&self, input: NewTender) -> StoreResult<Tender>;
    async fn get(&self, id: &str) -> StoreResult<Option<Tender>>;
    /// `filter` empty means every service type.
    async fn list_page(&self, page: ListPage, filter: &[ServiceType]) -> StoreResult<Vec<Tender>>;
    async fn list_by_author(&self, page: ListPage, author: &str) -> StoreResult<Vec<Tender>>;
    async fn update_status(&self, id: &str, status: TenderStatus) -> StoreResult<Tender>;
    async fn edit(&self, id: &str, edit: TenderEdit) -> StoreResult<Tender>;
    async fn rollback(&self, id: &str, target: u32) -> StoreResult<Tender>;
    async fn has_author(&self, author: &str) -> StoreResult<bool>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Run a store future under a deadline.
///
/// On expiry the future is dropped, which releases any held lock or rolls back
/// an open transaction, and [`StoreError::DeadlineExceeded`] is returned.
pub async fn within<T, F>(timeout: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::DeadlineExceeded),
    }
}

pub(crate) fn record_error(backend: &'static str, err: &StoreError) {
    metrics::counter!(
        "tender_store_errors_total",
        "backend" => backend,
        "kind" => err.kind()
    )
    .increment(1);
}
