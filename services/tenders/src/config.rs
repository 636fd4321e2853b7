use crate::store::StoreConfig;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_POSTGRES_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_POSTGRES_ACQUIRE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_PAGE_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" | "pg" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend {other}"),
        }
    }
}

// Postgres connection settings. `url` may carry credentials and is never logged.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

// Tender service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct TendersConfig {
    // HTTP API listener bind address.
    pub bind_addr: SocketAddr,
    // Metrics HTTP listener bind address.
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    // Present whenever a URL was supplied, even with the memory backend selected.
    pub postgres: Option<PostgresConfig>,
    // Max wait for a tender row lock inside a transaction.
    pub lock_timeout_ms: u64,
    // Deadline applied by handlers to every store call.
    pub op_timeout_ms: u64,
    // Page size used when a list request carries no limit.
    pub default_page_limit: u32,
}

#[derive(Debug, Default, Deserialize)]
struct TendersConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
    postgres_connect_timeout_ms: Option<u64>,
    postgres_acquire_timeout_ms: Option<u64>,
    lock_timeout_ms: Option<u64>,
    op_timeout_ms: Option<u64>,
    default_page_limit: Option<u32>,
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

impl TendersConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("TENDERS_BIND")
            .or_else(|_| std::env::var("SERVER_ADDRESS"))
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse TENDERS_BIND")?;
        let metrics_bind = std::env::var("TENDERS_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse TENDERS_METRICS_BIND")?;
        let storage = match std::env::var("TENDERS_STORAGE_BACKEND") {
            Ok(value) => {
                StorageBackend::parse(&value).with_context(|| "parse TENDERS_STORAGE_BACKEND")?
            }
            Err(_) => StorageBackend::Memory,
        };
        let postgres = std::env::var("TENDERS_POSTGRES_URL")
            .or_else(|_| std::env::var("POSTGRES_CONN"))
            .ok()
            .map(|url| PostgresConfig {
                url,
                max_connections: env_u64(
                    "TENDERS_POSTGRES_MAX_CONNECTIONS",
                    u64::from(DEFAULT_POSTGRES_MAX_CONNECTIONS),
                ) as u32,
                connect_timeout_ms: env_u64(
                    "TENDERS_POSTGRES_CONNECT_TIMEOUT_MS",
                    DEFAULT_POSTGRES_CONNECT_TIMEOUT_MS,
                ),
                acquire_timeout_ms: env_u64(
                    "TENDERS_POSTGRES_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_POSTGRES_ACQUIRE_TIMEOUT_MS,
                ),
            });
        let lock_timeout_ms = env_u64("TENDERS_LOCK_TIMEOUT_MS", DEFAULT_LOCK_TIMEOUT_MS);
        let op_timeout_ms = env_u64("TENDERS_OP_TIMEOUT_MS", DEFAULT_OP_TIMEOUT_MS);
        let default_page_limit =
            env_u64("TENDERS_DEFAULT_PAGE_LIMIT", u64::from(DEFAULT_PAGE_LIMIT)) as u32;
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            lock_timeout_ms,
            op_timeout_ms,
            default_page_limit,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("TENDERS_CONFIG") {
            // YAML overrides allow ops-friendly config files.
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read TENDERS_CONFIG: {path}"))?;
            let override_cfg: TendersConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse tenders config yaml")?;
            config.apply(override_cfg)?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: TendersConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = StorageBackend::parse(&value).with_context(|| "parse storage")?;
        }
        if let Some(url) = override_cfg.postgres_url {
            let pg = self.postgres.get_or_insert_with(|| PostgresConfig {
                url: String::new(),
                max_connections: DEFAULT_POSTGRES_MAX_CONNECTIONS,
                connect_timeout_ms: DEFAULT_POSTGRES_CONNECT_TIMEOUT_MS,
                acquire_timeout_ms: DEFAULT_POSTGRES_ACQUIRE_TIMEOUT_MS,
            });
            pg.url = url;
        }
        if let Some(pg) = self.postgres.as_mut() {
            if let Some(value) = override_cfg.postgres_max_connections.filter(|v| *v > 0) {
                pg.max_connections = value;
            }
            if let Some(value) = override_cfg.postgres_connect_timeout_ms.filter(|v| *v > 0) {
                pg.connect_timeout_ms = value;
            }
            if let Some(value) = override_cfg.postgres_acquire_timeout_ms.filter(|v| *v > 0) {
                pg.acquire_timeout_ms = value;
            }
        }
        if let Some(value) = override_cfg.lock_timeout_ms.filter(|v| *v > 0) {
            self.lock_timeout_ms = value;
        }
        if let Some(value) = override_cfg.op_timeout_ms.filter(|v| *v > 0) {
            self.op_timeout_ms = value;
        }
        if let Some(value) = override_cfg.default_page_limit.filter(|v| *v > 0) {
            self.default_page_limit = value;
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            statement_timeout: self.op_timeout(),
        }
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
