//! Verification mail dispatcher: turns one queued verification notification
//! into one transactional email.
//!
//! Runs as its own deployable (`verification-mailer`). Credentials are read
//! from the secret store on every invocation and nothing is retried here;
//! redelivery is up to the host.

mod message;
mod secrets;
mod sendgrid;

use std::sync::Arc;

use aws_lambda_events::event::sns::SnsEvent;
use tracing::{info, instrument};

use crate::config::MailerConfig;

pub use message::{parse_notification, verification_link, VerificationRequest, DEFAULT_FIRST_NAME};
pub use secrets::{MailCredentials, SecretSource, SecretsManagerSource};
pub use sendgrid::{Address, Content, MailTransport, OutgoingMail, Personalization, SendGridClient, SUBJECT};

pub const SENT: &str = "Email sent successfully!";

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("SNS event does not contain any records")]
    NoRecords,
    #[error("malformed notification: {0}")]
    MalformedMessage(#[source] serde_json::Error),
    #[error("notification is missing `{0}`")]
    MissingField(&'static str),
    #[error("failed to retrieve secret: {0}")]
    Secret(String),
    #[error("malformed mail credentials: {0}")]
    Credentials(#[source] serde_json::Error),
    #[error("mail provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to send email: HTTP {status} - {body}")]
    Provider { status: u16, body: String },
}

pub struct Dispatcher {
    config: MailerConfig,
    secrets: Arc<dyn SecretSource>,
    transport: Arc<dyn MailTransport>,
}

impl Dispatcher {
    pub fn new(
        config: MailerConfig,
        secrets: Arc<dyn SecretSource>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            secrets,
            transport,
        }
    }

    /// AWS Secrets Manager + SendGrid, as configured.
    pub async fn from_config(config: MailerConfig) -> Self {
        let secrets = Arc::new(SecretsManagerSource::new(&config.region).await);
        let transport = Arc::new(SendGridClient::new(config.sendgrid_api_url.clone()));
        Self::new(config, secrets, transport)
    }

    /// Only the first record is consumed.
    pub async fn handle_event(&self, event: SnsEvent) -> Result<String, MailerError> {
        let record = event.records.into_iter().next().ok_or(MailerError::NoRecords)?;
        self.handle_message(&record.sns.message).await
    }

    #[instrument(skip(self, raw))]
    pub async fn handle_message(&self, raw: &str) -> Result<String, MailerError> {
        let request = parse_notification(raw)?;
        info!(email = %request.email, "verification notification received");

        let secret = self.secrets.secret_string(&self.config.secret_name).await?;
        let credentials = MailCredentials::from_secret(&secret)?;

        let link = verification_link(&self.config.verify_endpoint, &request.email, &request.token);
        let mail = OutgoingMail::verification(
            &credentials.sender_email,
            &request.email,
            &request.first_name,
            &link,
        );
        self.transport
            .send(&credentials.sendgrid_api_key, &mail)
            .await?;

        info!(email = %request.email, "verification email sent");
        Ok(SENT.to_string())
    }
}
