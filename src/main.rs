mod client_key;
mod clock;
mod config;
mod delivery;
mod error;
mod handlers;
mod mailer;
mod metrics;
mod models;
mod rate_limit;
mod state;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::client_key::HeaderClientKeyResolver;
use crate::clock::SystemClock;
use crate::config::Args;
use crate::delivery::{Profile, ResumeDelivery};
use crate::mailer::HttpMailer;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG and the mail settings are visible
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let rate_window = i64::try_from(args.rate_window)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| anyhow::anyhow!("rate window of {}s is out of range", args.rate_window))?;
    let rate_limiter = Arc::new(RateLimiter::new(args.rate_limit, rate_window));

    let delivery = match args.mail_settings() {
        Some(settings) => {
            let mailer = HttpMailer::new(
                &settings.api_url,
                settings.api_key,
                Duration::from_secs(args.mail_timeout),
            )?;
            let profile = Profile {
                name: args.owner_name.clone(),
                title: args.owner_title.clone(),
                sender: settings.from,
                owner_email: settings.owner_email,
                resume_path: args.resume_path.clone(),
                resume_filename: args.resume_filename.clone(),
            };
            tracing::info!("Mail relay: {}", settings.api_url);
            Some(ResumeDelivery::new(Arc::new(mailer), profile))
        }
        None => {
            tracing::warn!("Mail relay is not configured, resume requests will fail until it is");
            None
        }
    };

    if !args.resume_path.exists() {
        tracing::warn!("Resume not found at {}", args.resume_path.display());
    }

    let state = Arc::new(AppState {
        rate_limiter,
        resolver: Arc::new(HeaderClientKeyResolver),
        clock: Arc::new(SystemClock),
        delivery,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Resume mailer running on http://localhost:{}", args.port);
    tracing::info!(
        "Rate limit: {} requests per {} seconds",
        args.rate_limit,
        args.rate_window
    );
    axum::serve(listener, app).await?;
    Ok(())
}
