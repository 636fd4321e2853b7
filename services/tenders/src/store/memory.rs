//! In-memory implementation of the tender store.
//!
//! # Purpose
//! This store implements the `TenderStore` trait entirely in memory, keeping every tender in an
//! insertion-ordered `Vec` with an id index, all guarded by a single `tokio::sync::RwLock`. It
//! exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: reads take the read lock, mutations take the write lock for
//!   the whole ledger step, so readers never see a half-applied version.
//! - Mutations never await while holding the write lock. Dropping a mutation future (for example
//!   when a deadline fires) therefore either happens before the lock is granted or after the
//!   step has completed.
//!
//! # Performance characteristics
//! - Reads are concurrent; lookups by id are O(1) through the index.
//! - Lists scan the collection in insertion order, filter, then apply offset/limit.
//! - Writes are serialized across all tenders.
//!
//! # Metrics
//! Updates `tenders_total`, `tender_ledger_appends_total` and `tender_store_errors_total` so that
//! observability matches the Postgres backend.
use super::ledger::{self, Change};
use super::{StoreError, StoreResult, TenderStore, record_error};
use crate::model::{ListPage, NewTender, ServiceType, Tender, TenderEdit, TenderStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const BACKEND: &str = "memory";

/// Insertion-ordered tenders plus an id → position index.
#[derive(Debug, Default)]
struct TenderTable {
    rows: Vec<Tender>,
    index: HashMap<String, usize>,
}

impl TenderTable {
    fn get(&self, id: &str) -> Option<&Tender> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Tender> {
        let pos = *self.index.get(id)?;
        self.rows.get_mut(pos)
    }

    fn push(&mut self, tender: Tender) {
        self.index.insert(tender.id.clone(), self.rows.len());
        self.rows.push(tender);
    }
}

/// In-memory tender store.
///
/// Cloning shares the same underlying table.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tenders: Arc<RwLock<TenderTable>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate(&self, id: &str, change: Change) -> StoreResult<Tender> {
        let mut table = self.tenders.write().await;
        // No await points past this line: the step is applied whole or not at all.
        let result = match table.get_mut(id) {
            Some(tender) => ledger::append(tender, &change).map(|()| tender.clone()),
            None => Err(StoreError::NotFound(format!("tender {id}"))),
        };
        drop(table);
        match result {
            Ok(tender) => {
                metrics::counter!("tender_ledger_appends_total", "op" => change.op()).increment(1);
                tracing::debug!(
                    tender_id = %tender.id,
                    version = tender.version,
                    op = change.op(),
                    "tender version appended"
                );
                Ok(tender)
            }
            Err(err) => {
                record_error(BACKEND, &err);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl TenderStore for InMemoryStore {
    async fn create(&self, input: NewTender) -> StoreResult<Tender> {
        let tender = ledger::validate_new(input).inspect_err(|err| record_error(BACKEND, err))?;
        let mut table = self.tenders.write().await;
        table.push(tender.clone());
        metrics::gauge!("tenders_total").set(table.rows.len() as f64);
        drop(table);
        metrics::counter!("tender_ledger_appends_total", "op" => "create").increment(1);
        tracing::debug!(tender_id = %tender.id, author = %tender.author, "tender created");
        Ok(tender)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Tender>> {
        Ok(self.tenders.read().await.get(id).cloned())
    }

    async fn list_page(&self, page: ListPage, filter: &[ServiceType]) -> StoreResult<Vec<Tender>> {
        let table = self.tenders.read().await;
        let matching = table
            .rows
            .iter()
            .filter(|tender| filter.is_empty() || filter.contains(&tender.service_type));
        Ok(page.window(matching).cloned().collect())
    }

    async fn list_by_author(&self, page: ListPage, author: &str) -> StoreResult<Vec<Tender>> {
        let table = self.tenders.read().await;
        let matching = table.rows.iter().filter(|tender| tender.author == author);
        Ok(page.window(matching).cloned().collect())
    }

    async fn update_status(&self, id: &str, status: TenderStatus) -> StoreResult<Tender> {
        self.mutate(id, Change::Status(status)).await
    }

    async fn edit(&self, id: &str, edit: TenderEdit) -> StoreResult<Tender> {
        self.mutate(id, Change::Edit(edit)).await
    }

    async fn rollback(&self, id: &str, target: u32) -> StoreResult<Tender> {
        self.mutate(id, Change::Rollback(target)).await
    }

    async fn has_author(&self, author: &str) -> StoreResult<bool> {
        let table = self.tenders.read().await;
        Ok(table.rows.iter().any(|tender| tender.author == author))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
