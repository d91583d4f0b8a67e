use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("resume_requests_total", "Total number of resume requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("resume_rate_limited_total", "Requests denied by the rate limiter").unwrap();
    pub static ref DELIVERIES: Counter =
        register_counter!("resume_deliveries_total", "Resumes delivered successfully").unwrap();
    pub static ref DELIVERY_FAILURES: Counter =
        register_counter!("resume_delivery_failures_total", "Failed resume deliveries").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "resume_request_latency_seconds",
        "Resume request latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_WINDOWS: Gauge =
        register_gauge!("resume_rate_limit_windows", "Rate limit windows currently tracked").unwrap();
}
