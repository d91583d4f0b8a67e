use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::mailer::DeliveryError;
use crate::models::{ErrorBody, RateLimitedBody, iso};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit exceeded, retry in {retry_after}s")]
    RateLimited {
        limit: u32,
        reset_time: DateTime<Utc>,
        retry_after: i64,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::RateLimited {
                limit,
                reset_time,
                retry_after,
            } => {
                let mut headers = rate_limit_headers(limit, 0, reset_time);
                headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
                let body = RateLimitedBody {
                    error: "Rate limit exceeded. Too many resume requests.".to_string(),
                    details: format!("You can request another resume in {} seconds.", retry_after),
                    reset_time: iso(reset_time),
                    retry_after,
                };
                return (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg, None)
            }
            AppError::Delivery(err) => {
                tracing::error!("Delivery error: {}", err);
                let (error, details) = delivery_message(err);
                (StatusCode::INTERNAL_SERVER_ERROR, error, details)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}

// Human readable message and hint for each delivery failure class
fn delivery_message(err: DeliveryError) -> (String, Option<String>) {
    match err {
        DeliveryError::Auth(_) => (
            "Email authentication failed.".to_string(),
            Some("Please check your email credentials in the environment variables.".to_string()),
        ),
        DeliveryError::Connection(_) => (
            "Connection error.".to_string(),
            Some(
                "Unable to connect to the email server. Please check your internet connection."
                    .to_string(),
            ),
        ),
        DeliveryError::ArtifactMissing(_) => ("Resume file not found".to_string(), None),
        DeliveryError::Other(msg) => {
            let details = if msg.trim().is_empty() {
                "An unexpected error occurred.".to_string()
            } else {
                msg
            };
            (
                "Failed to send resume. Please try again later.".to_string(),
                Some(details),
            )
        }
    }
}

pub fn rate_limit_headers(limit: u32, remaining: u32, reset_time: DateTime<Utc>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    if let Ok(reset) = HeaderValue::from_str(&iso(reset_time)) {
        headers.insert(X_RATELIMIT_RESET, reset);
    }
    headers
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rate_limited_sets_retry_headers() {
        let reset = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).unwrap();
        let res = AppError::RateLimited {
            limit: 2,
            reset_time: reset,
            retry_after: 280,
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[RETRY_AFTER], "280");
        assert_eq!(res.headers()[X_RATELIMIT_LIMIT], "2");
        assert_eq!(res.headers()[X_RATELIMIT_REMAINING], "0");
        assert_eq!(res.headers()[X_RATELIMIT_RESET], "2025-03-01T09:05:00.000Z");
    }

    #[test]
    fn status_per_error_class() {
        let cases = [
            (AppError::BadRequest("Email is required".into()), StatusCode::BAD_REQUEST),
            (AppError::Configuration("missing".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::Delivery(DeliveryError::Connection("refused".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn delivery_messages_are_classified() {
        let (error, details) = delivery_message(DeliveryError::Auth("535".into()));
        assert_eq!(error, "Email authentication failed.");
        assert!(details.unwrap().contains("credentials"));

        let (error, _) = delivery_message(DeliveryError::Connection("timed out".into()));
        assert_eq!(error, "Connection error.");

        let (error, details) = delivery_message(DeliveryError::Other(String::new()));
        assert_eq!(error, "Failed to send resume. Please try again later.");
        assert_eq!(details.as_deref(), Some("An unexpected error occurred."));

        let (_, details) = delivery_message(DeliveryError::Other("relay returned 422".into()));
        assert_eq!(details.as_deref(), Some("relay returned 422"));
    }
}
