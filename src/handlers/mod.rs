mod health;
mod metrics;
mod suggest;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use suggest::suggest_handler;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/suggest", post(suggest_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
