mod health;
mod metrics;
mod send_resume;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use send_resume::send_resume_handler;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/send-resume", post(send_resume_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
