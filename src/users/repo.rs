use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_AVATAR: &str = "https://s3.amazonaws.com/FringeBucket/default-user.png";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<OffsetDateTime>,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
}

/// Registration input. The admin flag is absent on purpose: accounts created
/// through this path are never admins, and the avatar falls back to the
/// stock image.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

impl User {
    pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar, first_name, last_name,
                   reset_password_token, reset_password_expires, is_admin, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar, first_name, last_name,
                   reset_password_token, reset_password_expires, is_admin, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar, first_name, last_name,
                   reset_password_token, reset_password_expires, is_admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        new: &NewUser,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let avatar = new.avatar.as_deref().unwrap_or(DEFAULT_AVATAR);
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, avatar, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, avatar, first_name, last_name,
                      reset_password_token, reset_password_expires, is_admin, created_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(password_hash)
        .bind(avatar)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(db)
        .await
    }

    pub async fn set_reset_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = $2, reset_password_expires = $3
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Look up a user by an unexpired reset token.
    pub async fn find_by_valid_reset_token(
        db: &PgPool,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar, first_name, last_name,
                   reset_password_token, reset_password_expires, is_admin, created_at
            FROM users
            WHERE reset_password_token = $1 AND reset_password_expires > now()
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await
    }

    /// Apply a new credential and clear the reset token pair.
    pub async fn reset_password(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_password_token = NULL, reset_password_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}
