use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];
const DEFAULT_EXTENSION: &str = ".jpg";

#[derive(Debug, thiserror::Error)]
pub enum PictureError {
    #[error("File size exceeds maximum limit of 5MB")]
    FileTooLarge { size: usize },
    #[error("Invalid file type. Only PNG, JPG, and JPEG are allowed")]
    UnsupportedType(Option<String>),
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

pub struct PictureUpload<'a> {
    pub body: Bytes,
    pub content_type: Option<&'a str>,
    pub file_name: Option<&'a str>,
}

/// Validate and store a profile image privately. Returns the object key.
pub async fn put_picture(
    storage: &dyn StorageClient,
    upload: PictureUpload<'_>,
    owner_id: i64,
) -> Result<String, PictureError> {
    let size = upload.body.len();
    if size > MAX_PICTURE_BYTES {
        warn!(owner_id, size, "profile picture too large");
        return Err(PictureError::FileTooLarge { size });
    }

    let content_type = match upload.content_type {
        Some(ct) if ALLOWED_CONTENT_TYPES.contains(&ct) => ct,
        other => {
            warn!(owner_id, content_type = ?other, "profile picture type rejected");
            return Err(PictureError::UnsupportedType(other.map(str::to_string)));
        }
    };

    let key = picture_key(owner_id, extension_of(upload.file_name));
    storage
        .put_object(&key, upload.body, content_type)
        .await
        .map_err(PictureError::Storage)?;
    debug!(owner_id, %key, size, "profile picture stored");
    Ok(key)
}

pub async fn delete_picture(storage: &dyn StorageClient, key: &str) -> Result<(), PictureError> {
    storage
        .delete_object(key)
        .await
        .map_err(PictureError::Storage)?;
    debug!(%key, "profile picture deleted");
    Ok(())
}

fn picture_key(owner_id: i64, extension: &str) -> String {
    format!(
        "users/{}/profile-picture-{}{}",
        owner_id,
        Uuid::new_v4(),
        extension
    )
}

/// Extension including the dot, `.jpg` when the name has none.
fn extension_of(file_name: Option<&str>) -> &str {
    file_name
        .and_then(|name| name.rfind('.').map(|i| &name[i..]))
        .unwrap_or(DEFAULT_EXTENSION)
}
