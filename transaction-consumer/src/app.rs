use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::search_transactions;
use crate::store::TransactionEventReader;

#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<dyn TransactionEventReader>,
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new().route("/transactions", post(search_transactions));

    let health_routes = Router::new()
        .route("/", get(index))
        .route("/_liveness", get(liveness))
        .route("/_readiness", get(readiness));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "transaction-consumer"
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    state
        .reader
        .health_check()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok("ok")
}
