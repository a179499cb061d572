use axum::{extract::State, Json};
use common_types::TransactionEventFilter;
use tracing::debug;

use crate::api::types::{TransactionSearchRequest, TransactionSearchResponse};
use crate::app::AppState;
use crate::error::ApiError;
use crate::metrics_consts::SEARCH_RESULTS;

pub async fn search_transactions(
    State(state): State<AppState>,
    Json(request): Json<TransactionSearchRequest>,
) -> Result<Json<TransactionSearchResponse>, ApiError> {
    let filter = TransactionEventFilter::try_from(&request)?;
    debug!(?filter, "searching transactions");

    let events = state.reader.search(&filter).await?;
    metrics::histogram!(SEARCH_RESULTS).record(events.len() as f64);

    Ok(Json(TransactionSearchResponse::new(&request, &events)))
}
