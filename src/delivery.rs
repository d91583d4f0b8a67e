use chrono::{DateTime, SecondsFormat, Utc};
use minijinja::{Environment, context};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::mailer::{Attachment, DeliveryError, Mailer, OutgoingEmail};

// Email bodies, compiled in. Names ending in .html are auto-escaped.
static EMAIL_ENV: OnceLock<Environment<'static>> = OnceLock::new();

const EMAIL_TEMPLATES: [(&str, &str); 4] = [
    ("resume.html", include_str!("../templates/email/resume.html")),
    ("resume.txt", include_str!("../templates/email/resume.txt")),
    ("notification.html", include_str!("../templates/email/notification.html")),
    ("notification.txt", include_str!("../templates/email/notification.txt")),
];

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    for (name, source) in EMAIL_TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load email template {}: {}", name, e);
        }
    }
    env
}

fn render(name: &str, ctx: minijinja::Value) -> Result<String, DeliveryError> {
    let env = EMAIL_ENV.get_or_init(init_environment);
    env.get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|e| DeliveryError::Other(format!("failed to render {}: {}", name, e)))
}

// Who the résumé belongs to and where it lives
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub title: Option<String>,
    pub sender: String,
    pub owner_email: String,
    pub resume_path: PathBuf,
    pub resume_filename: String,
}

/// Sends the résumé to a requester and a notification to the owner.
///
/// Both messages go out concurrently and both are allowed to finish. The
/// résumé's error is reported ahead of the notification's; nothing is retried.
pub struct ResumeDelivery {
    mailer: Arc<dyn Mailer>,
    profile: Profile,
}

impl ResumeDelivery {
    pub fn new(mailer: Arc<dyn Mailer>, profile: Profile) -> Self {
        Self { mailer, profile }
    }

    pub async fn load_resume(&self) -> Result<Vec<u8>, DeliveryError> {
        let path = &self.profile.resume_path;
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DeliveryError::ArtifactMissing(path.display().to_string()),
            _ => DeliveryError::Other(format!("failed to read resume: {}", e)),
        })
    }

    pub async fn deliver(
        &self,
        recipient: &str,
        client_key: &str,
        resume: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        let resume_email = self.resume_email(recipient, resume)?;
        let notification = self.notification_email(recipient, client_key, now)?;

        let (sent_resume, sent_notification) =
            tokio::join!(self.mailer.send(&resume_email), self.mailer.send(&notification));
        sent_resume.and(sent_notification)
    }

    fn resume_email(&self, recipient: &str, resume: Vec<u8>) -> Result<OutgoingEmail, DeliveryError> {
        let p = &self.profile;
        let ctx = context! {
            name => &p.name,
            title => &p.title,
            owner_email => &p.owner_email,
        };

        Ok(OutgoingEmail {
            from: p.sender.clone(),
            to: recipient.to_string(),
            subject: format!("My Resume - {}", p.name),
            text: render("resume.txt", ctx.clone())?,
            html: render("resume.html", ctx)?,
            attachments: vec![Attachment {
                filename: p.resume_filename.clone(),
                content_type: "application/pdf".to_string(),
                content: resume,
            }],
        })
    }

    fn notification_email(
        &self,
        recipient: &str,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<OutgoingEmail, DeliveryError> {
        let p = &self.profile;
        let ctx = context! {
            recipient => recipient,
            client_key => client_key,
            requested_at => now.to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        Ok(OutgoingEmail {
            from: p.sender.clone(),
            to: p.owner_email.clone(),
            subject: "Resume Request - Portfolio Notification".to_string(),
            text: render("notification.txt", ctx.clone())?,
            html: render("notification.html", ctx)?,
            attachments: Vec::new(),
        })
    }
}
