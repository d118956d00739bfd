use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use super::MailerError;

pub const SUBJECT: &str = "Verify Your Email Address";

/// SendGrid v3 `mail/send` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMail {
    pub personalizations: Vec<Personalization>,
    pub from: Address,
    pub subject: String,
    pub content: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Personalization {
    pub to: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl OutgoingMail {
    pub fn verification(from: &str, to: &str, first_name: &str, link: &str) -> Self {
        let body = format!(
            "Hi {first_name},\n\nPlease verify your email address by clicking the link below:\n{link}\n\nThank you!"
        );
        Self {
            personalizations: vec![Personalization {
                to: vec![Address { email: to.to_string() }],
            }],
            from: Address {
                email: from.to_string(),
            },
            subject: SUBJECT.to_string(),
            content: vec![Content {
                kind: "text/plain".into(),
                value: body,
            }],
        }
    }

    pub fn recipient(&self) -> Option<&str> {
        self.personalizations
            .first()
            .and_then(|p| p.to.first())
            .map(|a| a.email.as_str())
    }
}

/// Delivers one mail. Never retries.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, api_key: &str, mail: &OutgoingMail) -> Result<(), MailerError>;
}

pub struct SendGridClient {
    http: reqwest::Client,
    url: String,
}

impl SendGridClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl MailTransport for SendGridClient {
    async fn send(&self, api_key: &str, mail: &OutgoingMail) -> Result<(), MailerError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(mail)
            .send()
            .await?;

        let status = response.status();
        info!(status = status.as_u16(), "sendgrid responded");
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "sendgrid rejected mail");
            return Err(MailerError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
