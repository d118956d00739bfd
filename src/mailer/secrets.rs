use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_sdk_secretsmanager::{config::Region, error::DisplayErrorContext, Client};
use serde::Deserialize;

use super::MailerError;

/// Mail-provider credentials stored as a JSON secret string.
#[derive(Debug, Clone, Deserialize)]
pub struct MailCredentials {
    pub sendgrid_api_key: String,
    pub sender_email: String,
}

impl MailCredentials {
    pub fn from_secret(raw: &str) -> Result<Self, MailerError> {
        serde_json::from_str(raw).map_err(MailerError::Credentials)
    }
}

#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn secret_string(&self, name: &str) -> Result<String, MailerError>;
}

pub struct SecretsManagerSource {
    client: Client,
}

impl SecretsManagerSource {
    pub async fn new(region: &str) -> Self {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: Client::new(&shared),
        }
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    async fn secret_string(&self, name: &str) -> Result<String, MailerError> {
        let out = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| MailerError::Secret(DisplayErrorContext(&e).to_string()))?;
        out.secret_string()
            .map(str::to_string)
            .ok_or_else(|| MailerError::Secret("secret value is binary, expected string".into()))
    }
}
