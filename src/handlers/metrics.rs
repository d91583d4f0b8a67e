use axum::http::{StatusCode, header::CONTENT_TYPE};
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};

use crate::error::AppError;

pub async fn metrics_handler() -> Result<impl IntoResponse, AppError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(format!("failed to encode metrics: {}", e)))?;

    let body = String::from_utf8(buffer)
        .map_err(|e| AppError::Internal(format!("metrics are not utf-8: {}", e)))?;
    Ok((StatusCode::OK, [(CONTENT_TYPE, encoder.format_type().to_string())], body))
}
