use clap::Parser;
use std::path::PathBuf;

use crate::rate_limit::{MAX_REQUESTS, MAX_WINDOW_SECS, WINDOW_SECS};

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "resume-mailer")]
#[command(about = "Rate limited resume delivery endpoint for a portfolio site")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Rate limit max requests per window
    #[arg(
        long,
        env = "RATE_LIMIT_MAX_REQUESTS",
        default_value_t = MAX_REQUESTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(
        long,
        env = "RATE_LIMIT_WINDOW_SECS",
        default_value_t = WINDOW_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS)
    )]
    pub rate_window: u64,

    // Base url of the HTTP mail relay
    #[arg(long, env = "MAIL_API_URL")]
    pub mail_api_url: Option<String>,

    // Bearer credential for the mail relay
    #[arg(long, env = "MAIL_API_KEY", hide_env_values = true)]
    pub mail_api_key: Option<String>,

    // Sender address, also the default notification inbox
    #[arg(long, env = "EMAIL_USER")]
    pub mail_from: Option<String>,

    // Where resume request notifications go
    #[arg(long, env = "OWNER_EMAIL")]
    pub owner_email: Option<String>,

    #[arg(long, env = "OWNER_NAME", default_value = "Portfolio Owner")]
    pub owner_name: String,

    // Signature line under the owner's name
    #[arg(long, env = "OWNER_TITLE")]
    pub owner_title: Option<String>,

    #[arg(long, env = "RESUME_PATH", default_value = "public/resume.pdf")]
    pub resume_path: PathBuf,

    // Attachment filename seen by the requester
    #[arg(long, env = "RESUME_FILENAME", default_value = "Resume.pdf")]
    pub resume_filename: String,

    // Per-send timeout for the mail relay in seconds
    #[arg(long, env = "MAIL_TIMEOUT_SECS", default_value_t = 10)]
    pub mail_timeout: u64,
}

// Credentials needed before any mail can go out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub owner_email: String,
}

impl Args {
    // None when any piece of the mail relay configuration is missing
    pub fn mail_settings(&self) -> Option<MailSettings> {
        let api_url = non_blank(self.mail_api_url.as_deref())?;
        let api_key = non_blank(self.mail_api_key.as_deref())?;
        let from = non_blank(self.mail_from.as_deref())?;
        let owner_email = non_blank(self.owner_email.as_deref()).unwrap_or_else(|| from.clone());

        Some(MailSettings {
            api_url,
            api_key,
            from,
            owner_email,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
