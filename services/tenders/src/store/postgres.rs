//! Postgres-backed implementation of the tender store.
//!
//! # What this module is
//! This module implements the `TenderStore` trait using Postgres (via `sqlx`) as a durable,
//! shared backing store for tenders and their version ledger.
//!
//! # Data model
//! 1) **`tenders`** holds the live state of each tender plus `created_seq`, a `BIGSERIAL` that
//!    gives lists a stable insertion order.
//! 2) **`tender_versions`** is the append-only ledger: one row per `(tender_id, version)`.
//!    Rows are never updated or deleted.
//!
//! # Consistency / atomicity
//! Every mutation runs in one transaction:
//! 1) `SELECT ... FOR UPDATE` on the tender row (existence check and per-tender serialization).
//! 2) `COUNT(*)` of its ledger rows, checked against the version pointer.
//! 3) For rollback, the target snapshot is read; a missing target aborts before any write.
//! 4) The ledger computes the next snapshot; `UPDATE tenders` and `INSERT tender_versions`.
//! 5) `COMMIT`.
//!
//! Any error returns early and drops the `sqlx::Transaction`, which rolls it back. The same
//! happens when the caller's deadline drops the future mid-transaction.
//!
//! Reads run inside a `REPEATABLE READ, READ ONLY` transaction so a tender and its versions come
//! from one snapshot.
//!
//! # Concurrency model
//! - The store is shared across async handlers; `sqlx::PgPool` manages connections.
//! - `lock_timeout` and `statement_timeout` are set per transaction from [`StoreConfig`], so a
//!   contended row lock fails fast as [`StoreError::DeadlineExceeded`] instead of hanging.
//!
//! # Operational notes
//! - Migrations are executed at startup via `sqlx::migrate!("./migrations")`.
//! - Database URLs may contain credentials; never log them.
use super::ledger::{self, Change};
use super::{StoreConfig, StoreError, StoreResult, TenderStore, record_error};
use crate::config::PostgresConfig;
use crate::model::{
    ListPage, NewTender, ServiceType, Tender, TenderEdit, TenderStatus, TenderVersion,
};
use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;

const BACKEND: &str = "postgres";

const TENDER_COLUMNS: &str = "tender_id, tender_name, tender_description, service_type, status, \
     organization_id, version, created_at, author";

const VERSION_COLUMNS: &str =
    "tender_id, version, tender_name, tender_description, service_type, status";

/// Durable tender store backed by Postgres.
///
/// # Errors
/// - Connection and query failures surface as [`StoreError::Storage`].
/// - Lock or statement timeouts surface as [`StoreError::DeadlineExceeded`].
///
/// # Example
/// ```rust,no_run
/// use tenders::config::PostgresConfig;
/// use tenders::store::{StoreConfig, postgres::PostgresStore};
///
/// async fn open(pg: PostgresConfig, cfg: StoreConfig) {
///     let _ = PostgresStore::connect(&pg, cfg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
    config: StoreConfig,
}

/// Row shape for the `tenders` table.
#[derive(Debug, Clone, FromRow)]
struct DbTender {
    tender_id: String,
    tender_name: String,
    tender_description: String,
    service_type: String,
    status: String,
    organization_id: String,
    version: i32,
    created_at: String,
    author: String,
}

/// Row shape for the `tender_versions` table.
#[derive(Debug, Clone, FromRow)]
struct DbTenderVersion {
    tender_id: String,
    version: i32,
    tender_name: String,
    tender_description: String,
    service_type: String,
    status: String,
}

impl PostgresStore {
    /// Connect to Postgres and apply the embedded migrations.
    ///
    /// # Errors
    /// - Connection, migration, or pool setup failures.
    pub async fn connect(pg: &PostgresConfig, config: StoreConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, config, true).await
    }

    /// Connect to Postgres without running migrations.
    ///
    /// Intended for tests that manage migrations externally.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(
        pg: &PostgresConfig,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        Self::connect_internal(pg, config, false).await
    }

    async fn connect_internal(
        pg: &PostgresConfig,
        config: StoreConfig,
        run_migrations: bool,
    ) -> StoreResult<Self> {
        // Avoid logging `pg.url` because it may contain credentials.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
            .await
            .map_err(|_| StoreError::Storage(anyhow!("timed out connecting to postgres")))??;

        if run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        let store = Self { pool, config };
        store.refresh_count().await?;
        Ok(store)
    }

    /// Open a transaction with the configured lock and statement timeouts.
    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true), set_config('statement_timeout', $2, true)")
            .bind(format!("{}ms", self.config.lock_timeout.as_millis()))
            .bind(format!("{}ms", self.config.statement_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Open a read-only transaction that sees one consistent snapshot.
    async fn begin_read(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn refresh_count(&self) -> StoreResult<()> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenders")
            .fetch_one(&self.pool)
            .await?;
        metrics::gauge!("tenders_total").set(total as f64);
        Ok(())
    }

    async fn insert_new(&self, tender: &Tender) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            r#"INSERT INTO tenders (tender_id, tender_name, tender_description, service_type, status, organization_id, version, created_at, author)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(&tender.id)
        .bind(&tender.name)
        .bind(&tender.description)
        .bind(tender.service_type.as_str())
        .bind(tender.status.as_str())
        .bind(&tender.organization_id)
        .bind(to_db_version(tender.version)?)
        .bind(&tender.created_at)
        .bind(&tender.author)
        .execute(&mut *tx)
        .await?;

        for snapshot in tender.versions.values() {
            insert_version(&mut *tx, &tender.id, snapshot).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn mutate(&self, id: &str, change: Change) -> StoreResult<Tender> {
        match self.mutate_in_tx(id, &change).await {
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

    async fn mutate_in_tx(&self, id: &str, change: &Change) -> StoreResult<Tender> {
        let mut tx = self.begin().await?;
        let row = sqlx::query_as::<_, DbTender>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders WHERE tender_id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;
        let Some(row) = row else {
            return Err(StoreError::NotFound(format!("tender {id}")));
        };

        let recorded: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tender_versions WHERE tender_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(classify)?;
        let live = live_from_db(&row)?;
        let next = ledger::next_version(id, live.version, recorded.max(0) as u64)?;

        let target = match change.rollback_target() {
            Some(version) => fetch_version(&mut *tx, id, version).await?,
            None => None,
        };
        let snapshot = ledger::next_snapshot(id, &live, next, change, target.as_ref())?;

        sqlx::query(
            r#"UPDATE tenders SET tender_name = $1, tender_description = $2, service_type = $3, status = $4, version = $5
               WHERE tender_id = $6"#,
        )
        .bind(&snapshot.name)
        .bind(&snapshot.description)
        .bind(snapshot.service_type.as_str())
        .bind(snapshot.status.as_str())
        .bind(to_db_version(snapshot.version)?)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;
        insert_version(&mut *tx, id, &snapshot).await?;

        let mut versions = load_versions(&mut *tx, &[id.to_string()]).await?;
        tx.commit().await?;

        let mut updated = row;
        updated.tender_name = snapshot.name;
        updated.tender_description = snapshot.description;
        updated.service_type = snapshot.service_type.as_str().to_string();
        updated.status = snapshot.status.as_str().to_string();
        updated.version = to_db_version(snapshot.version)?;
        let history = versions.remove(id).unwrap_or_default();
        tender_from_db(updated, history)
    }

    async fn list_where(
        &self,
        clause: &str,
        page: ListPage,
        bind: ListBind<'_>,
    ) -> StoreResult<Vec<Tender>> {
        let mut tx = self.begin_read().await?;
        let sql = format!(
            "SELECT {TENDER_COLUMNS} FROM tenders WHERE {clause} ORDER BY created_seq LIMIT $2 OFFSET $3"
        );
        let query = sqlx::query_as::<_, DbTender>(&sql);
        let query = match bind {
            ListBind::ServiceTypes(types) => query.bind(types),
            ListBind::Author(author) => query.bind(author),
        };
        let rows = query
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&mut *tx)
            .await?;
        let ids: Vec<String> = rows.iter().map(|row| row.tender_id.clone()).collect();
        let mut versions = load_versions(&mut *tx, &ids).await?;
        tx.commit().await?;

        rows.into_iter()
            .map(|row| {
                let history = versions.remove(&row.tender_id).unwrap_or_default();
                tender_from_db(row, history)
            })
            .collect()
    }
}

/// Parameter for the `$1` placeholder of a list query.
enum ListBind<'a> {
    ServiceTypes(Vec<String>),
    Author(&'a str),
}

#[async_trait]
impl TenderStore for PostgresStore {
    async fn create(&self, input: NewTender) -> StoreResult<Tender> {
        let tender = ledger::validate_new(input).inspect_err(|err| record_error(BACKEND, err))?;
        if let Err(err) = self.insert_new(&tender).await {
            record_error(BACKEND, &err);
            return Err(err);
        }
        metrics::counter!("tender_ledger_appends_total", "op" => "create").increment(1);
        tracing::debug!(tender_id = %tender.id, author = %tender.author, "tender created");
        if let Err(err) = self.refresh_count().await {
            tracing::warn!(error = %err, "failed to refresh tender count");
        }
        Ok(tender)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Tender>> {
        let mut tx = self.begin_read().await?;
        let row = sqlx::query_as::<_, DbTender>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders WHERE tender_id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut versions = load_versions(&mut *tx, &[id.to_string()]).await?;
        tx.commit().await?;
        let history = versions.remove(id).unwrap_or_default();
        tender_from_db(row, history).map(Some)
    }

    async fn list_page(&self, page: ListPage, filter: &[ServiceType]) -> StoreResult<Vec<Tender>> {
        let types = filter.iter().map(|kind| kind.as_str().to_string()).collect();
        self.list_where(
            "(cardinality($1::text[]) = 0 OR service_type = ANY($1::text[]))",
            page,
            ListBind::ServiceTypes(types),
        )
        .await
    }

    async fn list_by_author(&self, page: ListPage, author: &str) -> StoreResult<Vec<Tender>> {
        self.list_where("author = $1", page, ListBind::Author(author))
            .await
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
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenders WHERE author = $1)")
                .bind(author)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

async fn insert_version(
    conn: &mut PgConnection,
    id: &str,
    snapshot: &TenderVersion,
) -> StoreResult<()> {
    sqlx::query(
        r#"INSERT INTO tender_versions (tender_id, version, tender_name, tender_description, service_type, status)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(id)
    .bind(to_db_version(snapshot.version)?)
    .bind(&snapshot.name)
    .bind(&snapshot.description)
    .bind(snapshot.service_type.as_str())
    .bind(snapshot.status.as_str())
    .execute(conn)
    .await
    .map_err(classify)?;
    Ok(())
}

async fn fetch_version(
    conn: &mut PgConnection,
    id: &str,
    version: u32,
) -> StoreResult<Option<TenderVersion>> {
    // Versions beyond the column range cannot exist.
    let Ok(version) = i32::try_from(version) else {
        return Ok(None);
    };
    let row = sqlx::query_as::<_, DbTenderVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM tender_versions WHERE tender_id = $1 AND version = $2"
    ))
    .bind(id)
    .bind(version)
    .fetch_optional(conn)
    .await
    .map_err(classify)?;
    row.map(version_from_db).transpose()
}

async fn load_versions(
    conn: &mut PgConnection,
    ids: &[String],
) -> StoreResult<HashMap<String, BTreeMap<u32, TenderVersion>>> {
    let mut grouped: HashMap<String, BTreeMap<u32, TenderVersion>> = HashMap::new();
    if ids.is_empty() {
        return Ok(grouped);
    }
    let rows = sqlx::query_as::<_, DbTenderVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM tender_versions WHERE tender_id = ANY($1) ORDER BY tender_id, version"
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;
    for row in rows {
        let tender_id = row.tender_id.clone();
        let snapshot = version_from_db(row)?;
        grouped
            .entry(tender_id)
            .or_default()
            .insert(snapshot.version, snapshot);
    }
    Ok(grouped)
}

/// Map driver errors, turning lock and statement timeouts into deadline errors.
fn classify(err: sqlx::Error) -> StoreError {
    if is_timeout(&err) {
        StoreError::DeadlineExceeded
    } else {
        err.into()
    }
}

/// `55P03` is lock_not_available, `57014` is query_canceled (statement timeout).
fn is_timeout(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err
            .code()
            .map(|code| code == "55P03" || code == "57014")
            .unwrap_or(false);
    }
    false
}

fn live_from_db(row: &DbTender) -> StoreResult<TenderVersion> {
    Ok(TenderVersion {
        version: from_db_version(row.version)?,
        name: row.tender_name.clone(),
        description: row.tender_description.clone(),
        service_type: parse_service_type(&row.service_type)?,
        status: parse_status(&row.status)?,
    })
}

fn tender_from_db(row: DbTender, versions: BTreeMap<u32, TenderVersion>) -> StoreResult<Tender> {
    let live = live_from_db(&row)?;
    Ok(Tender {
        id: row.tender_id,
        name: live.name,
        description: live.description,
        service_type: live.service_type,
        status: live.status,
        organization_id: row.organization_id,
        author: row.author,
        created_at: row.created_at,
        version: live.version,
        versions,
    })
}

fn version_from_db(row: DbTenderVersion) -> StoreResult<TenderVersion> {
    Ok(TenderVersion {
        version: from_db_version(row.version)?,
        name: row.tender_name,
        description: row.tender_description,
        service_type: parse_service_type(&row.service_type)?,
        status: parse_status(&row.status)?,
    })
}

fn parse_service_type(value: &str) -> StoreResult<ServiceType> {
    value
        .parse()
        .map_err(|_| StoreError::Storage(anyhow!("invalid service type {value}")))
}

fn parse_status(value: &str) -> StoreResult<TenderStatus> {
    value
        .parse()
        .map_err(|_| StoreError::Storage(anyhow!("invalid tender status {value}")))
}

fn from_db_version(value: i32) -> StoreResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|version| *version >= 1)
        .ok_or_else(|| StoreError::Storage(anyhow!("invalid version {value}")))
}

fn to_db_version(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Storage(anyhow!("version {value} out of range")))
}
