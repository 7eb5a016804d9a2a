use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::cfg::Config;


/// An outgoing email. Built for a single send, never stored.
#[derive(Debug, Clone, Default)]
pub struct Notification {
    /// Display name of the sender.
    pub from: String,
    pub from_mail: String,
    /// Identity of the party being notified.
    pub to: String,
    pub to_mails: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub plaintext: String,
    pub html: String,
    pub attachment: Option<PathBuf>,
}

impl Notification {
    /// Notification addressed according to the configuration, with the
    /// configured message as body.
    pub fn from_config(cfg: &Config) -> Self
    {
        Self {
            from: cfg.emails.from.clone(),
            from_mail: cfg.emails.from_mail.clone(),
            to: cfg.isp.clone(),
            to_mails: cfg.emails.to_mails.clone(),
            bcc: cfg.emails.bcc.clone(),
            subject: cfg.report_title.clone(),
            plaintext: cfg.message.clone(),
            html: cfg.message.clone(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: PathBuf) -> Self
    {
        self.attachment = Some(path);
        self
    }

    fn check_addressing(&self) -> Result<(), NotifyError>
    {
        if self.to_mails.is_empty() || self.to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        if self.from.is_empty() || self.from_mail.is_empty() {
            return Err(NotifyError::NoSender);
        }
        if self.subject.is_empty() {
            return Err(NotifyError::NoSubject);
        }
        Ok(())
    }
}


#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email API key not configured")]
    MissingCredential,
    #[error("empty destination details")]
    NoRecipients,
    #[error("empty sender details")]
    NoSender,
    #[error("empty subject")]
    NoSubject,
    #[error("unable to read attachment {path}: {source}")]
    Attachment { path: String, source: std::io::Error },
    #[error("sending email failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

impl NotifyError {
    /// Configuration problems that no amount of retrying will fix.
    pub fn is_config_error(&self) -> bool
    {
        matches!(self, Self::MissingCredential | Self::NoRecipients | Self::NoSender | Self::NoSubject)
    }
}


#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `notification`, returning the transport's status code.
    async fn send(&self, notification: &Notification) -> Result<String, NotifyError>;
}


/// Sends notifications through the SendGrid v3 mail API.
#[derive(Debug, Clone)]
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SendGridMailer {
    pub fn new(api_key: &str, endpoint: &str) -> anyhow::Result<Self>
    {
        let client = Client::builder()
            .user_agent(concat!("ispmon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, api_key: api_key.to_string(), endpoint: endpoint.to_string() })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self>
    {
        Self::new(&cfg.sendgrid_api_key, &cfg.sendgrid_endpoint)
    }

    async fn build_message(&self, n: &Notification) -> Result<Value, NotifyError>
    {
        let mut to = Vec::new();
        for (i, address) in n.to_mails.iter().enumerate() {
            if i == 0 {
                to.push(json!({ "email": address, "name": &n.to }));
            } else {
                to.push(json!({ "email": address }));
            }
        }

        let mut personalization = json!({ "to": to });
        if !n.bcc.is_empty() {
            let bcc: Vec<Value> = n.bcc.iter().map(|address| json!({ "email": address })).collect();
            personalization["bcc"] = Value::Array(bcc);
        }

        let mut message = json!({
            "personalizations": [personalization],
            "from": { "email": &n.from_mail, "name": &n.from },
            "subject": &n.subject,
            "content": [
                { "type": "text/plain", "value": &n.plaintext },
                { "type": "text/html", "value": &n.html },
            ],
        });

        if let Some(path) = &n.attachment {
            let content = tokio::fs::read(path).await
                .map_err(|source| NotifyError::Attachment { path: path.display().to_string(), source })?;
            let filename = path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "outage-report.json".to_string());
            message["attachments"] = json!([{
                "content": BASE64.encode(content),
                "type": "application/json",
                "filename": filename,
                "disposition": "attachment",
                "content_id": "Outage Report",
            }]);
        }

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, n: &Notification) -> Result<String, NotifyError>
    {
        if self.api_key.is_empty() {
            error!("{}", NotifyError::MissingCredential);
            return Err(NotifyError::MissingCredential);
        }
        n.check_addressing()
            .inspect_err(|e| error!("not sending email {:?}: {}", n.subject, e))?;

        let message = self.build_message(n).await
            .inspect_err(|e| error!("{}", e))?;

        let response = self.client.post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send().await
            .inspect_err(|e| error!("sending email failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("email rejected with status {}: {}", status, body);
            return Err(NotifyError::Rejected { status, body });
        }

        info!("email {:?} accepted with status {}", n.subject, status);
        Ok(status.as_u16().to_string())
    }
}
