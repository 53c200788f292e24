use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::code::CodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<OffsetDateTime>,
    pub last_login_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Active paid subscription, or still inside the trial window.
    pub fn has_active_subscription(&self, now: OffsetDateTime) -> bool {
        self.subscription_status == SubscriptionStatus::Active
            || self.trial_ends_at.map(|t| now < t).unwrap_or(false)
    }
}

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, email_verified,
    subscription_status, trial_ends_at, last_login_at, created_at, updated_at
"#;

pub async fn find_user_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(db)
    .await
    .context("find user by email")?;
    Ok(user)
}

pub async fn find_user_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find user by id")?;
    Ok(user)
}

/// Create a user with a fresh 7-day trial window.
pub async fn insert_user(
    db: &PgPool,
    email: &str,
    password_hash: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, trial_ends_at)
        VALUES ($1, $2, $3, $4, now() + interval '7 days')
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(email)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(db)
    .await
}

pub async fn touch_last_login(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET last_login_at = now(), updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await
        .context("touch last login")?;
    Ok(())
}

pub async fn insert_verification_code(
    db: &PgPool,
    user_id: Uuid,
    code: &str,
    kind: CodeKind,
    expires_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO verification_codes (user_id, code, kind, expires_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(code)
    .bind(kind)
    .bind(expires_at)
    .execute(db)
    .await
    .context("insert verification code")?;
    Ok(())
}

/// Marks a matching unused, unexpired code as used. The conditional UPDATE is
/// the only consumption path, so a replayed or expired code can never win the
/// race: at most one caller gets a row back.
pub async fn consume_verification_code(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: Uuid,
    code: &str,
    kind: CodeKind,
) -> anyhow::Result<Option<Uuid>> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE verification_codes
           SET used_at = now()
         WHERE user_id = $1 AND code = $2 AND kind = $3
           AND used_at IS NULL AND expires_at > now()
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(code)
    .bind(kind)
    .fetch_optional(executor)
    .await
    .context("consume verification code")?;
    Ok(id)
}

/// Consume an email-verification code and flip the flag in one transaction.
/// Returns false (and changes nothing) when no valid code matched.
pub async fn verify_email(db: &PgPool, user_id: Uuid, code: &str) -> anyhow::Result<bool> {
    let mut tx = db.begin().await.context("begin verify email")?;

    let consumed =
        consume_verification_code(&mut *tx, user_id, code, CodeKind::EmailVerification).await?;
    if consumed.is_none() {
        return Ok(false);
    }

    sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("mark email verified")?;

    tx.commit().await.context("commit verify email")?;
    Ok(true)
}

/// Consume a password-reset code and store the new hash in one transaction.
pub async fn reset_password(
    db: &PgPool,
    user_id: Uuid,
    code: &str,
    new_password_hash: &str,
) -> anyhow::Result<bool> {
    let mut tx = db.begin().await.context("begin reset password")?;

    let consumed =
        consume_verification_code(&mut *tx, user_id, code, CodeKind::PasswordReset).await?;
    if consumed.is_none() {
        return Ok(false);
    }

    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .await
        .context("store new password hash")?;

    tx.commit().await.context("commit reset password")?;
    Ok(true)
}
