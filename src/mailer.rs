use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

// Classified delivery failure
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("mail relay rejected credentials: {0}")]
    Auth(String),

    #[error("could not reach mail relay: {0}")]
    Connection(String),

    #[error("resume not found at {0}")]
    ArtifactMissing(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError>;
}

// Wire format expected by the relay
#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
    attachments: Vec<RelayAttachment<'a>>,
}

#[derive(Serialize)]
struct RelayAttachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    content: String,
}

/// Sends mail through an HTTP relay (`POST {base_url}/emails`, bearer auth).
pub struct HttpMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Other(format!("failed to build mail client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let message = RelayMessage {
            from: &email.from,
            to: [&email.to],
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
            attachments: email
                .attachments
                .iter()
                .map(|a| RelayAttachment {
                    filename: &a.filename,
                    content_type: &a.content_type,
                    content: STANDARD.encode(&a.content),
                })
                .collect(),
        };

        let res = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }

        let body = res.text().await.unwrap_or_default();
        Err(classify_status(status, body))
    }
}

fn classify_transport(err: reqwest::Error) -> DeliveryError {
    if err.is_connect() || err.is_timeout() {
        DeliveryError::Connection(err.to_string())
    } else {
        DeliveryError::Other(format!("Request failed: {}", err))
    }
}

pub fn classify_status(status: StatusCode, body: String) -> DeliveryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DeliveryError::Auth(status.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            DeliveryError::Connection(status.to_string())
        }
        _ if body.trim().is_empty() => DeliveryError::Other(format!("mail relay returned {}", status)),
        _ => DeliveryError::Other(format!("mail relay returned {}: {}", status, body.trim())),
    }
}
