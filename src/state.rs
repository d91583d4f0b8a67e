use std::sync::Arc;

use crate::client_key::ClientKeyResolver;
use crate::clock::Clock;
use crate::delivery::ResumeDelivery;
use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub resolver: Arc<dyn ClientKeyResolver>,
    pub clock: Arc<dyn Clock>,
    // None until mail relay credentials are configured
    pub delivery: Option<ResumeDelivery>,
}
