use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": state.clock.now().to_rfc3339(),
        "mailConfigured": state.delivery.is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_key::HeaderClientKeyResolver;
    use crate::clock::ManualClock;
    use crate::rate_limit::RateLimiter;
    use axum::body::to_bytes;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn reports_healthy_with_clock_time() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let state = Arc::new(AppState {
            rate_limiter: Arc::new(RateLimiter::default()),
            resolver: Arc::new(HeaderClientKeyResolver),
            clock: Arc::new(ManualClock::new(now)),
            delivery: None,
        });

        let res = health_handler(State(state)).await.into_response();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["timestamp"], now.to_rfc3339());
        assert_eq!(json["mailConfigured"], false);
    }
}
