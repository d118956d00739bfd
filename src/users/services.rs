//! User lifecycle: registration, email verification, self-service profile
//! changes, profile pictures and account deletion.
//!
//! Every operation that mutates a record takes an explicit `now` in its
//! `*_at` form; the plain form uses the wall clock.

use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::{ProfilePatch, Registration};
use super::repo_types::{Lookup, NewUser, ProfilePicture, User};
use crate::auth::hash_password;
use crate::error::UserError;
use crate::notify::{publish_json, VerificationNotification};
use crate::pictures::{delete_picture, put_picture, PictureUpload};
use crate::state::AppState;

pub const VERIFICATION_TOKEN_TTL: Duration = Duration::minutes(10);

pub async fn register(st: &AppState, reg: Registration) -> Result<User, UserError> {
    register_at(st, reg, OffsetDateTime::now_utc()).await
}

/// Persist an unverified user and queue the verification message.
///
/// A publish failure is reported to the caller but the record stays: the
/// account exists, unverified, until someone intervenes.
pub async fn register_at(
    st: &AppState,
    reg: Registration,
    now: OffsetDateTime,
) -> Result<User, UserError> {
    if st.users.find_by_email(&reg.email).await?.is_found() {
        warn!(email = %reg.email, "email already in use");
        return Err(UserError::DuplicateEmail);
    }

    let verification_token = Uuid::new_v4().to_string();
    let token_expiration_time = now + VERIFICATION_TOKEN_TTL;
    let password_hash = hash_password(&reg.password)?;

    let user = st
        .users
        .insert(NewUser {
            email: reg.email,
            password_hash,
            first_name: reg.first_name,
            last_name: reg.last_name,
            verification_token: verification_token.clone(),
            token_expiration_time,
            created_at: now,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "insert user failed");
            UserError::from(e)
        })?;
    info!(user_id = user.id, email = %user.email, "user registered");

    let notification = VerificationNotification {
        user_id: user.id,
        email: user.email.clone(),
        verification_token,
        token_expiration_time,
    };
    match publish_json(st.notifier.as_ref(), &st.config.sns_topic_arn, &notification).await {
        Ok(message_id) => {
            info!(user_id = user.id, %message_id, "verification notification queued");
            Ok(user)
        }
        Err(e) => {
            error!(user_id = user.id, error = %e, "verification notification not queued; account left unverified");
            Err(e.into())
        }
    }
}

pub async fn verify(st: &AppState, token: &str) -> Result<User, UserError> {
    verify_at(st, token, OffsetDateTime::now_utc()).await
}

/// Consume a verification token. Expired tokens stay on the record and keep
/// failing until the account is removed.
pub async fn verify_at(st: &AppState, token: &str, now: OffsetDateTime) -> Result<User, UserError> {
    let mut user = match st.users.find_by_verification_token(token).await? {
        Lookup::Found(u) => u,
        Lookup::NotFound => {
            warn!("verification failed: unknown token");
            return Err(UserError::InvalidToken);
        }
    };

    match user.token_expiration_time {
        Some(expires) if now <= expires => {}
        _ => {
            warn!(user_id = user.id, "verification failed: token expired");
            return Err(UserError::TokenExpired);
        }
    }

    user.mark_verified();
    user.account_updated = now;
    st.users.update(&user).await?;
    info!(user_id = user.id, "user verified");
    Ok(user)
}

async fn load(st: &AppState, email: &str) -> Result<User, UserError> {
    match st.users.find_by_email(email).await? {
        Lookup::Found(u) => Ok(u),
        Lookup::NotFound => {
            warn!(%email, "no record for principal");
            Err(UserError::NotFound)
        }
    }
}

/// The principal's own record; unverified accounts are refused.
pub async fn get_self(st: &AppState, email: &str) -> Result<User, UserError> {
    let user = load(st, email).await?;
    if !user.verified {
        warn!(user_id = user.id, "access blocked for unverified user");
        return Err(UserError::Unverified);
    }
    Ok(user)
}

pub async fn update_self(st: &AppState, email: &str, patch: ProfilePatch) -> Result<User, UserError> {
    update_self_at(st, email, patch, OffsetDateTime::now_utc()).await
}

pub async fn update_self_at(
    st: &AppState,
    email: &str,
    patch: ProfilePatch,
    now: OffsetDateTime,
) -> Result<User, UserError> {
    let mut user = load(st, email).await?;
    if let Some(first_name) = patch.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = patch.last_name {
        user.last_name = last_name;
    }
    let password_changed = patch.password.is_some();
    if let Some(password) = patch.password {
        user.password_hash = hash_password(&password)?;
    }
    user.account_updated = now;
    st.users.update(&user).await?;
    info!(user_id = user.id, password_changed, "user updated");
    Ok(user)
}

/// Remove the account and its stored picture. A failed picture delete
/// aborts the whole operation and the record is kept.
pub async fn delete_self(st: &AppState, email: &str) -> Result<(), UserError> {
    let user = load(st, email).await?;
    if let Some(pic) = user.profile_picture() {
        delete_picture(st.storage.as_ref(), &pic.key)
            .await
            .map_err(|e| {
                error!(user_id = user.id, key = %pic.key, error = %e, "profile picture delete failed; user kept");
                e
            })?;
    }
    st.users.delete(user.id).await?;
    info!(user_id = user.id, "user deleted");
    Ok(())
}

pub async fn upload_profile_picture(
    st: &AppState,
    email: &str,
    upload: PictureUpload<'_>,
) -> Result<User, UserError> {
    upload_profile_picture_at(st, email, upload, OffsetDateTime::now_utc()).await
}

/// Store a new picture and record it. Any previous object is removed
/// afterwards; failing to remove it only logs. If the record cannot be
/// written the new object is removed again.
pub async fn upload_profile_picture_at(
    st: &AppState,
    email: &str,
    upload: PictureUpload<'_>,
    now: OffsetDateTime,
) -> Result<User, UserError> {
    let mut user = load(st, email).await?;
    let key = put_picture(st.storage.as_ref(), upload, user.id).await?;
    let url = st.storage.object_url(&key);

    let previous = user.profile_picture();
    user.set_profile_picture(Some(ProfilePicture {
        key: key.clone(),
        url,
        uploaded_at: now,
    }));
    user.account_updated = now;
    if let Err(e) = st.users.update(&user).await {
        if let Err(cleanup) = delete_picture(st.storage.as_ref(), &key).await {
            warn!(user_id = user.id, %key, error = %cleanup, "unreferenced profile picture not removed");
        }
        return Err(e.into());
    }
    info!(user_id = user.id, "profile picture uploaded");

    if let Some(old) = previous {
        if let Err(e) = delete_picture(st.storage.as_ref(), &old.key).await {
            warn!(user_id = user.id, key = %old.key, error = %e, "stale profile picture not removed");
        }
    }
    Ok(user)
}

pub async fn delete_profile_picture(st: &AppState, email: &str) -> Result<User, UserError> {
    delete_profile_picture_at(st, email, OffsetDateTime::now_utc()).await
}

/// No-op when no picture is set.
pub async fn delete_profile_picture_at(
    st: &AppState,
    email: &str,
    now: OffsetDateTime,
) -> Result<User, UserError> {
    let mut user = load(st, email).await?;
    let Some(pic) = user.profile_picture() else {
        return Ok(user);
    };
    delete_picture(st.storage.as_ref(), &pic.key).await?;
    user.set_profile_picture(None);
    user.account_updated = now;
    st.users.update(&user).await?;
    info!(user_id = user.id, "profile picture deleted");
    Ok(user)
}
