//! Tender HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, observability, and the HTTP router, then
//! serves the API until shutdown.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tenders::app::{AppState, build_router};
use tenders::config::{StorageBackend, TendersConfig};
use tenders::observability;
use tenders::store::{TenderStore, memory::InMemoryStore, postgres::PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = TendersConfig::from_env_or_yaml().context("load tender config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: TendersConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("tenders")?;
    let state = build_state(&config).await?;
    tracing::info!(
        backend = state.store.backend_name(),
        durable = state.store.is_durable(),
        "tender store ready"
    );
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "tender api listening");
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &TendersConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn TenderStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(
                PostgresStore::connect(pg, config.store_config())
                    .await
                    .context("connect postgres tender store")?,
            )
        }
    };

    Ok(AppState {
        store,
        op_timeout: config.op_timeout(),
        default_page_limit: config.default_page_limit,
    })
}
