use std::time::Instant;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{DeleteParams, RegisterRequest, UpdateRequest, UserDto, VerifyParams};
use super::repo_types::User;
use super::services;
use crate::metrics::{
    PIC_DELETE, PIC_UNSUPPORTED_METHOD, PIC_UPLOAD, USER_CREATE, USER_DELETE, USER_GET,
    USER_UPDATE, USER_VERIFY,
};
use crate::pictures::{PictureError, PictureUpload};
use crate::{auth::Principal, error::UserError, state::AppState};

/// Multipart requests may exceed the picture ceiling so that the size check
/// reports `FileTooLarge` rather than a transport error.
const PICTURE_BODY_LIMIT: usize = 10 * 1024 * 1024;
const PICTURE_FIELD: &str = "profilePic";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/user", post(create_user))
        .route("/v1/user/verify", get(verify_user))
        .route(
            "/v1/user/self",
            get(get_self).put(update_self).delete(delete_self),
        )
        .route(
            "/v1/user/self/pic",
            post(upload_profile_picture)
                .delete(delete_profile_picture)
                .put(picture_method_not_allowed)
                .patch(picture_method_not_allowed)
                .head(picture_method_not_allowed)
                .options(picture_method_not_allowed)
                .layer(DefaultBodyLimit::max(PICTURE_BODY_LIMIT)),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserDto>), UserError> {
    let started = Instant::now();
    let Json(req) = payload.map_err(|e| {
        warn!(error = %e, "unreadable registration body");
        UserError::validation("body", "must be a JSON object")
    })?;
    let registration = req.validate().map_err(|errors| {
        warn!(?errors, "invalid registration");
        UserError::Validation(errors)
    })?;
    let user = services::register(&state, registration).await?;
    state.metrics.completed(USER_CREATE, started.elapsed());
    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

#[instrument(skip(state, params))]
pub async fn verify_user(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<&'static str, UserError> {
    let started = Instant::now();
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(UserError::InvalidToken)?;
    services::verify(&state, token.trim()).await?;
    state.metrics.completed(USER_VERIFY, started.elapsed());
    Ok("Account verified successfully.")
}

#[instrument(skip(state, principal))]
pub async fn get_self(
    State(state): State<AppState>,
    principal: Result<Principal, UserError>,
) -> Result<Json<UserDto>, UserError> {
    let started = Instant::now();
    let principal = authenticated(&state, USER_GET, principal)?;
    let user = services::get_self(&state, &principal.email).await?;
    state.metrics.completed(USER_GET, started.elapsed());
    Ok(Json(UserDto::from(&user)))
}

#[instrument(skip(state, principal, payload))]
pub async fn update_self(
    State(state): State<AppState>,
    principal: Result<Principal, UserError>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UserDto>, UserError> {
    let started = Instant::now();
    let principal = authenticated(&state, USER_UPDATE, principal)?;
    let Json(req) = payload.map_err(|e| {
        warn!(error = %e, "unreadable update body");
        UserError::validation("body", "must be a JSON object")
    })?;
    let patch = req.into_patch(&principal.email).map_err(|errors| {
        warn!(?errors, "invalid update");
        UserError::Validation(errors)
    })?;
    let user = services::update_self(&state, &principal.email, patch).await?;
    state.metrics.completed(USER_UPDATE, started.elapsed());
    Ok(Json(UserDto::from(&user)))
}

/// Unauthenticated; the account is named by the `email` query parameter.
#[instrument(skip(state))]
pub async fn delete_self(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Result<&'static str, UserError> {
    let started = Instant::now();
    let email = params
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| UserError::validation("email", "must not be blank"))?;
    services::delete_self(&state, &email).await?;
    state.metrics.completed(USER_DELETE, started.elapsed());
    Ok("User deleted successfully")
}

#[instrument(skip(state, principal, multipart))]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    principal: Result<Principal, UserError>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UserDto>), UserError> {
    let started = Instant::now();
    let principal = authenticated(&state, PIC_UPLOAD, principal)?;
    match store_upload(&state, &principal, multipart).await {
        Ok(user) => {
            state.metrics.completed(PIC_UPLOAD, started.elapsed());
            Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
        }
        Err(e) => {
            state.metrics.error(PIC_UPLOAD);
            Err(e)
        }
    }
}

async fn store_upload(
    state: &AppState,
    principal: &Principal,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<User, UserError> {
    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "not a multipart request");
        UserError::validation(PICTURE_FIELD, "must be sent as multipart/form-data")
    })?;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some(PICTURE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let body = field.bytes().await.map_err(read_error)?;

        let upload = PictureUpload {
            body,
            content_type: content_type.as_deref(),
            file_name: file_name.as_deref(),
        };
        return services::upload_profile_picture(state, &principal.email, upload).await;
    }

    Err(UserError::validation(PICTURE_FIELD, "is required"))
}

/// A body cut off by the route limit is an oversize picture, not a
/// transport failure.
fn read_error(e: MultipartError) -> UserError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(limit = PICTURE_BODY_LIMIT, "upload exceeded body limit");
        return PictureError::FileTooLarge {
            size: PICTURE_BODY_LIMIT,
        }
        .into();
    }
    UserError::UploadRead(e.body_text())
}

#[instrument(skip(state, principal))]
pub async fn delete_profile_picture(
    State(state): State<AppState>,
    principal: Result<Principal, UserError>,
) -> Result<Json<UserDto>, UserError> {
    let started = Instant::now();
    let principal = authenticated(&state, PIC_DELETE, principal)?;
    let user = services::delete_profile_picture(&state, &principal.email).await?;
    state.metrics.completed(PIC_DELETE, started.elapsed());
    Ok(Json(UserDto::from(&user)))
}

pub async fn picture_method_not_allowed(State(state): State<AppState>) -> StatusCode {
    state.metrics.incr(PIC_UNSUPPORTED_METHOD);
    StatusCode::METHOD_NOT_ALLOWED
}

/// Counts `{endpoint}.auth.error` for rejected credentials.
fn authenticated(
    state: &AppState,
    endpoint: &str,
    principal: Result<Principal, UserError>,
) -> Result<Principal, UserError> {
    principal.map_err(|e| {
        state.metrics.auth_error(endpoint);
        e
    })
}
