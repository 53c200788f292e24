use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::{TokenKind, TokenService};
use crate::auth::repo::{self, User};
use crate::error::AppError;
use crate::state::AppState;

/// Requires a valid bearer access token and yields the caller's user id.
///
/// A missing or malformed Authorization header is 401; a header that is
/// present but carries a bad, expired or wrong-kind token is 403.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let service = TokenService::from_ref(state);
        let claims = service.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Forbidden("Invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Forbidden("Access token required".into()));
        }

        Ok(AuthUser(claims.sub))
    }
}

/// Like [`AuthUser`] but never rejects: anonymous or bad-token requests
/// simply carry no user id. No route requires it today.
#[allow(dead_code)]
pub struct MaybeAuthUser(pub Option<Uuid>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = AuthUser::from_request_parts(parts, state)
            .await
            .map(|AuthUser(id)| id)
            .ok();
        Ok(MaybeAuthUser(user_id))
    }
}

/// [`AuthUser`] plus a database check that the account verified its email.
pub struct VerifiedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let user = repo::find_user_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        if !user.email_verified {
            warn!(%user_id, "email not verified");
            return Err(AppError::Forbidden("Email verification required".into()));
        }
        Ok(VerifiedUser(user))
    }
}

/// [`AuthUser`] plus a database check for an active subscription or a still
/// running trial.
pub struct SubscribedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SubscribedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let user = repo::find_user_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        if !user.has_active_subscription(time::OffsetDateTime::now_utc()) {
            warn!(%user_id, "subscription expired");
            return Err(AppError::Forbidden("Active subscription required".into()));
        }
        Ok(SubscribedUser(user))
    }
}
