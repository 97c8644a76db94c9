use axum::{Json, extract::State, extract::rejection::JsonRejection};
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{SuggestRequest, SuggestResponse};
use crate::state::AppState;

pub async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Json<SuggestResponse>, AppError> {
    REQUEST_TOTAL.inc();

    let Json(request) = payload.map_err(|e| AppError::MalformedRequest(e.body_text()))?;
    let (prefs, locale) = request.into_preferences()?;

    let start_time = Instant::now();
    let response = state.orchestrator.suggest(&prefs, locale.as_deref()).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    Ok(Json(response))
}
