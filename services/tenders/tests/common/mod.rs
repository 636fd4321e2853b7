use std::sync::Arc;
use std::time::Duration;
use tenders::app::{AppState, build_router};
use tenders::store::TenderStore;
use tenders::store::memory::InMemoryStore;

pub type TestApp = axum::routing::RouterIntoService<axum::body::Body, ()>;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn app_with_store(store: Arc<dyn TenderStore>) -> TestApp {
    let state = AppState {
        store,
        op_timeout: Duration::from_secs(2),
        default_page_limit: tenders::config::DEFAULT_PAGE_LIMIT,
    };
    build_router(state).into_service()
}

pub fn memory_app() -> TestApp {
    app_with_store(Arc::new(InMemoryStore::new()))
}

pub fn new_tender_body(name: &str, service_type: &str, author: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "description": format!("{name} description"),
        "serviceType": service_type,
        "organizationId": "org-1",
        "creatorUsername": author
    })
}
