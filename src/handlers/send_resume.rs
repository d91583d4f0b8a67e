use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

use crate::client_key::fingerprint;
use crate::error::{AppError, Result, rate_limit_headers};
use crate::metrics::{
    DELIVERIES, DELIVERY_FAILURES, RATE_LIMIT_WINDOWS, RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL,
};
use crate::models::{RateLimitInfo, SendResumeRequest, SendResumeResponse, iso};
use crate::state::AppState;

pub async fn send_resume_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<SendResumeRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<SendResumeResponse>)> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let now = state.clock.now();
    let client_key = state.resolver.resolve(&headers);
    let client = fingerprint(&client_key);

    // admission is decided and recorded before anything can fail
    let limiter = &state.rate_limiter;
    let decision = limiter.check(&client_key, now);
    RATE_LIMIT_WINDOWS.set(limiter.tracked() as f64);
    tracing::debug!(%client, allowed = decision.allowed, remaining = decision.remaining, "rate limit check");

    if !decision.allowed {
        RATE_LIMITED.inc();
        let retry_after = decision.retry_after_secs(now);
        tracing::warn!(%client, retry_after, "resume request rate limited");
        return Err(AppError::RateLimited {
            limit: limiter.max_requests(),
            reset_time: decision.reset_time,
            retry_after,
        });
    }

    let recipient = validated_recipient(payload)?;

    let delivery = state
        .delivery
        .as_ref()
        .ok_or_else(|| AppError::Configuration("Email configuration is missing.".to_string()))?;

    let resume = delivery.load_resume().await?;

    if let Err(e) = delivery.deliver(&recipient, &client_key, resume, now).await {
        DELIVERY_FAILURES.inc();
        return Err(e.into());
    }

    DELIVERIES.inc();
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    tracing::info!(%client, remaining = decision.remaining, "resume delivered");

    let headers = rate_limit_headers(limiter.max_requests(), decision.remaining, decision.reset_time);
    let body = SendResumeResponse {
        message: "Resume sent successfully!".to_string(),
        rate_limit: RateLimitInfo {
            remaining: decision.remaining,
            reset_time: iso(decision.reset_time),
        },
    };
    Ok((headers, Json(body)))
}

fn validated_recipient(
    payload: std::result::Result<Json<SendResumeRequest>, JsonRejection>,
) -> Result<String> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!("rejected resume request body: {}", e);
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    let email = request
        .email()
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?;

    let normalized = SendResumeRequest {
        email: Some(email),
    };
    normalized
        .validate()
        .map_err(|_| AppError::BadRequest("Invalid email format".to_string()))?;

    Ok(normalized.email.unwrap_or_default())
}
