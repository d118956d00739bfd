use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

time::serde::format_description!(
    created_format,
    OffsetDateTime,
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);
time::serde::format_description!(upload_date_format, OffsetDateTime, "[year]-[month]-[day]");

use super::repo_types::User;
use super::validation::{FieldError, Validator};

/// Request body for `POST /v1/user`. Fields are optional so that missing
/// ones show up in the validation report instead of a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A registration that passed validation; email is trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, Vec<FieldError>> {
        Validator::new()
            .email("email", self.email.as_deref())
            .required("password", self.password.as_deref())
            .required("firstName", self.first_name.as_deref())
            .required("lastName", self.last_name.as_deref())
            .finish()?;
        Ok(Registration {
            email: self.email.unwrap_or_default().trim().to_lowercase(),
            password: self.password.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default().trim().to_string(),
            last_name: self.last_name.unwrap_or_default().trim().to_string(),
        })
    }
}

/// Request body for `PUT /v1/user/self`. Blank fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// The fields an update will actually change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfilePatch {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UpdateRequest {
    /// `principal_email` is the authenticated identity; the body may repeat
    /// it but never change it.
    pub fn into_patch(self, principal_email: &str) -> Result<ProfilePatch, Vec<FieldError>> {
        let mut v = Validator::new();
        if let Some(email) = non_blank(self.email) {
            if !email.trim().eq_ignore_ascii_case(principal_email) {
                v.fail("email", "cannot be changed");
            }
        }
        let patch = ProfilePatch {
            password: non_blank(self.password),
            first_name: non_blank(self.first_name).map(|s| s.trim().to_string()),
            last_name: non_blank(self.last_name).map(|s| s.trim().to_string()),
        };
        if patch == ProfilePatch::default() {
            v.fail("body", "no updatable field provided");
        }
        v.finish()?;
        Ok(patch)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub email: Option<String>,
}

/// Public view of a user. Key names are part of the wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: i64,
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "accountCreated", with = "created_format")]
    pub account_created: OffsetDateTime,
    #[serde(rename = "accountUpdated", with = "time::serde::rfc3339")]
    pub account_updated: OffsetDateTime,
    pub file_name: Option<String>,
    pub url: Option<String>,
    #[serde(with = "upload_date_format::option")]
    pub upload_date: Option<OffsetDateTime>,
    pub user_id: String,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        let pic = u.profile_picture();
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            account_created: u.account_created.to_offset(UtcOffset::UTC),
            account_updated: u.account_updated,
            file_name: pic.as_ref().map(|p| p.key.clone()),
            url: pic.as_ref().map(|p| p.url.clone()),
            upload_date: pic.map(|p| p.uploaded_at.to_offset(UtcOffset::UTC)),
            user_id: u.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::ProfilePicture;
    use time::macros::datetime;

    fn user() -> User {
        User {
            id: 12,
            email: "a@b.com".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            verified: true,
            verification_token: None,
            token_expiration_time: None,
            profile_pic_key: None,
            profile_pic_url: None,
            profile_pic_upload_date: None,
            account_created: datetime!(2024-03-01 09:05:07 UTC),
            account_updated: datetime!(2024-03-02 10:00:00 UTC),
        }
    }

    #[test]
    fn dto_keeps_mixed_key_casing_and_hides_hash() {
        let json = serde_json::to_value(UserDto::from(&user())).unwrap();
        assert_eq!(json["id"], 12);
        assert_eq!(json["firstName"], "A");
        assert_eq!(json["lastName"], "B");
        assert_eq!(json["accountCreated"], "2024-03-01 09:05:07");
        assert_eq!(json["accountUpdated"], "2024-03-02T10:00:00Z");
        assert_eq!(json["user_id"], "12");
        assert!(json["file_name"].is_null());
        assert!(json["url"].is_null());
        assert!(json["upload_date"].is_null());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn dto_includes_picture_fields_together() {
        let mut u = user();
        u.set_profile_picture(Some(ProfilePicture {
            key: "users/12/profile-picture-x.png".into(),
            url: "https://bucket.s3.amazonaws.com/users/12/profile-picture-x.png".into(),
            uploaded_at: datetime!(2024-04-05 23:59:00 UTC),
        }));
        let json = serde_json::to_value(UserDto::from(&u)).unwrap();
        assert_eq!(json["file_name"], "users/12/profile-picture-x.png");
        assert!(json["url"].as_str().unwrap().ends_with("/users/12/profile-picture-x.png"));
        assert_eq!(json["upload_date"], "2024-04-05");
    }

    #[test]
    fn register_validation_reports_missing_fields() {
        let errors = RegisterRequest {
            email: Some("a@b.com".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["password", "firstName", "lastName"]);
    }

    #[test]
    fn register_normalizes_email() {
        let reg = RegisterRequest {
            email: Some("  A@B.com ".into()),
            password: Some("pw".into()),
            first_name: Some("A".into()),
            last_name: Some("B".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(reg.email, "a@b.com");
        assert_eq!(reg.password, "pw");
    }

    #[test]
    fn update_ignores_blank_fields() {
        let patch = UpdateRequest {
            first_name: Some("New".into()),
            last_name: Some("".into()),
            password: Some("   ".into()),
            email: None,
        }
        .into_patch("a@b.com")
        .unwrap();
        assert_eq!(
            patch,
            ProfilePatch {
                first_name: Some("New".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn update_rejects_email_change_and_empty_body() {
        let errors = UpdateRequest {
            email: Some("other@b.com".into()),
            first_name: Some("X".into()),
            ..Default::default()
        }
        .into_patch("a@b.com")
        .unwrap_err();
        assert_eq!(errors[0].field, "email");

        assert!(UpdateRequest {
            email: Some("A@B.com".into()),
            ..Default::default()
        }
        .into_patch("a@b.com")
        .is_err());

        assert!(UpdateRequest {
            email: Some("A@B.com".into()),
            password: Some("new".into()),
            ..Default::default()
        }
        .into_patch("a@b.com")
        .is_ok());
    }
}
