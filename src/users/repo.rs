use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Lookup, NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistent user records: unique on email, indexed on verification token.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Lookup, StoreError>;
    async fn find_by_verification_token(&self, token: &str) -> Result<Lookup, StoreError>;
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;
    /// Writes every mutable column of `user` (last write wins).
    async fn update(&self, user: &User) -> Result<(), StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, is_verified,
    verification_token, token_expiration_time,
    profile_pic_key, profile_pic_url, profile_pic_upload_date,
    account_created, account_updated
"#;

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Lookup, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(match row {
            Some(u) => Lookup::Found(u),
            None => Lookup::NotFound,
        })
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Lookup, StoreError> {
        self.find_one("email", email).await
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Lookup, StoreError> {
        self.find_one("verification_token", token).await
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (
                email, password_hash, first_name, last_name, is_verified,
                verification_token, token_expiration_time,
                account_created, account_updated
            )
            VALUES ($1, $2, $3, $4, FALSE, $5, $6, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .bind(&new_user.verification_token)
            .bind(new_user.token_expiration_time)
            .bind(new_user.created_at)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    StoreError::DuplicateEmail
                }
                other => StoreError::Database(other),
            })
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2,
                   first_name = $3,
                   last_name = $4,
                   is_verified = $5,
                   verification_token = $6,
                   token_expiration_time = $7,
                   profile_pic_key = $8,
                   profile_pic_url = $9,
                   profile_pic_upload_date = $10,
                   account_updated = $11
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.verified)
        .bind(&user.verification_token)
        .bind(user.token_expiration_time)
        .bind(&user.profile_pic_key)
        .bind(&user.profile_pic_url)
        .bind(user.profile_pic_upload_date)
        .bind(user.account_updated)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
