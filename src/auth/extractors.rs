use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, error, warn};

use super::password::verify_password;
use crate::error::UserError;
use crate::state::AppState;
use crate::users::Lookup;

/// Identity established by HTTP Basic authentication. Self-service
/// operations act on this email and nothing else.
#[derive(Debug, Clone)]
pub struct Principal {
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = UserError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                debug!("missing Authorization header");
                UserError::Unauthenticated
            })?;

        let (email, password) = parse_basic(header).ok_or_else(|| {
            debug!("malformed basic credentials");
            UserError::Unauthenticated
        })?;

        let user = match state.users.find_by_email(&email).await? {
            Lookup::Found(u) => u,
            Lookup::NotFound => {
                warn!(%email, "authentication for unknown user");
                return Err(UserError::Unauthenticated);
            }
        };

        match verify_password(&password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(user_id = user.id, "authentication with wrong password");
                return Err(UserError::Unauthenticated);
            }
            Err(e) => {
                error!(user_id = user.id, error = %e, "stored password hash unreadable");
                return Err(UserError::Unauthenticated);
            }
        }

        Ok(Principal { email: user.email })
    }
}

/// `Basic base64(email:password)` -> (lowercased email, password).
fn parse_basic(header: &str) -> Option<(String, String)> {
    let encoded = header
        .strip_prefix("Basic ")
        .or_else(|| header.strip_prefix("basic "))?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (email, password) = text.split_once(':')?;
    if email.trim().is_empty() {
        return None;
    }
    Some((email.trim().to_lowercase(), password.to_string()))
}
