//! Hand-off of verification messages to the notification channel (SNS).
//!
//! The message contract is shared with the `verification-mailer` binary,
//! which consumes what this module publishes.

use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_sdk_sns::{config::Region, error::DisplayErrorContext, Client};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("could not encode notification: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Channel(String),
}

/// Published once per registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationNotification {
    pub user_id: i64,
    pub email: String,
    pub verification_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub token_expiration_time: OffsetDateTime,
}

/// Returns the channel's message id. No retries are attempted.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, message: &str) -> Result<String, PublishError>;
}

/// Encode `payload` as JSON and publish it on `topic`.
pub async fn publish_json<T: Serialize + Sync>(
    notifier: &dyn Notifier,
    topic: &str,
    payload: &T,
) -> Result<String, PublishError> {
    let message = serde_json::to_string(payload)?;
    debug!(%topic, bytes = message.len(), "publishing notification");
    notifier.publish(topic, &message).await
}

#[derive(Clone)]
pub struct SnsNotifier {
    client: Client,
}

impl SnsNotifier {
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
impl Notifier for SnsNotifier {
    async fn publish(&self, topic: &str, message: &str) -> Result<String, PublishError> {
        let out = self
            .client
            .publish()
            .topic_arn(topic)
            .message(message)
            .send()
            .await
            .map_err(|e| PublishError::Channel(DisplayErrorContext(&e).to_string()))?;
        let message_id = out.message_id().unwrap_or_default().to_string();
        info!(%topic, %message_id, "sns message published");
        Ok(message_id)
    }
}
