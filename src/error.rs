//! Request-boundary error type. Every failure of the lifecycle service ends
//! up here and is mapped to a status code and a short plain-text body.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::notify::PublishError;
use crate::pictures::PictureError;
use crate::users::{FieldError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid request data: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Email already in use")]
    DuplicateEmail,

    #[error("User not found")]
    NotFound,

    #[error("Invalid or expired verification token.")]
    InvalidToken,

    #[error("Verification link has expired.")]
    TokenExpired,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Account has not been verified")]
    Unverified,

    #[error(transparent)]
    Picture(#[from] PictureError),

    #[error("Could not read uploaded file: {0}")]
    UploadRead(String),

    #[error("Failed to send verification email due to: {0}")]
    Publish(#[from] PublishError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => UserError::DuplicateEmail,
            StoreError::Database(e) => UserError::Internal(anyhow::Error::new(e).context("user store")),
        }
    }
}

impl UserError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        UserError::Validation(vec![FieldError { field, message }])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UserError::Validation(_)
            | UserError::DuplicateEmail
            | UserError::InvalidToken
            | UserError::TokenExpired => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Unauthenticated => StatusCode::UNAUTHORIZED,
            UserError::Unverified => StatusCode::FORBIDDEN,
            UserError::Picture(_)
            | UserError::UploadRead(_)
            | UserError::Publish(_)
            | UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            UserError::Internal(err) => tracing::error!(error = %format!("{err:#}"), "internal error"),
            UserError::Picture(PictureError::Storage(err)) => {
                tracing::error!(error = %format!("{err:#}"), "storage error")
            }
            _ if status.is_server_error() => tracing::error!(error = %self, "request failed"),
            _ => tracing::debug!(%status, error = %self, "request rejected"),
        }

        let body = match &self {
            UserError::Picture(PictureError::Storage(_)) => "Failed to store profile picture".to_string(),
            other => other.to_string(),
        };

        if matches!(self, UserError::Unauthenticated) {
            return (
                status,
                [(header::WWW_AUTHENTICATE, r#"Basic realm="user-accounts""#)],
                body,
            )
                .into_response();
        }
        (status, body).into_response()
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
