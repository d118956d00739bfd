use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(rename = "is_verified")]
    pub verified: bool,
    pub verification_token: Option<String>,
    pub token_expiration_time: Option<OffsetDateTime>,
    pub profile_pic_key: Option<String>,
    pub profile_pic_url: Option<String>,
    pub profile_pic_upload_date: Option<OffsetDateTime>,
    pub account_created: OffsetDateTime,
    pub account_updated: OffsetDateTime,
}

/// The three profile-picture columns, which are set and cleared together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePicture {
    pub key: String,
    pub url: String,
    pub uploaded_at: OffsetDateTime,
}

impl User {
    pub fn profile_picture(&self) -> Option<ProfilePicture> {
        match (
            &self.profile_pic_key,
            &self.profile_pic_url,
            self.profile_pic_upload_date,
        ) {
            (Some(key), Some(url), Some(uploaded_at)) => Some(ProfilePicture {
                key: key.clone(),
                url: url.clone(),
                uploaded_at,
            }),
            _ => None,
        }
    }

    pub fn set_profile_picture(&mut self, pic: Option<ProfilePicture>) {
        match pic {
            Some(p) => {
                self.profile_pic_key = Some(p.key);
                self.profile_pic_url = Some(p.url);
                self.profile_pic_upload_date = Some(p.uploaded_at);
            }
            None => {
                self.profile_pic_key = None;
                self.profile_pic_url = None;
                self.profile_pic_upload_date = None;
            }
        }
    }

    /// Consume the pending token. Verification never reverts.
    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.verification_token = None;
        self.token_expiration_time = None;
    }
}

/// Insert payload for a freshly registered, unverified user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub verification_token: String,
    pub token_expiration_time: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// Outcome of a single-row lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(User),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}
