use serde::Deserialize;

use super::MailerError;

pub const DEFAULT_FIRST_NAME: &str = "User";

/// What the dispatcher needs from a verification notification. Extra keys
/// (`userId`, `tokenExpirationTime`) are accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub email: String,
    pub token: String,
    pub first_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNotification {
    email: Option<String>,
    verification_token: Option<String>,
    first_name: Option<String>,
}

pub fn parse_notification(raw: &str) -> Result<VerificationRequest, MailerError> {
    let msg: RawNotification = serde_json::from_str(raw).map_err(MailerError::MalformedMessage)?;
    let email = present(msg.email).ok_or(MailerError::MissingField("email"))?;
    let token = present(msg.verification_token).ok_or(MailerError::MissingField("verificationToken"))?;
    let first_name = present(msg.first_name).unwrap_or_else(|| DEFAULT_FIRST_NAME.to_string());
    Ok(VerificationRequest {
        email,
        token,
        first_name,
    })
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// `{endpoint}?email=..&token=..` with both values percent-encoded.
pub fn verification_link(endpoint: &str, email: &str, token: &str) -> String {
    format!(
        "{}?email={}&token={}",
        endpoint,
        urlencoding::encode(email),
        urlencoding::encode(token)
    )
}
