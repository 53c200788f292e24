use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        code::{self, CodeKind},
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshRequest,
            RegisterRequest, ResetPasswordRequest, TokenPair, TokensResponse, UserResponse,
            VerifyEmailRequest,
        },
        extractors::AuthUser,
        jwt::TokenService,
        password, repo,
    },
    error::{is_unique_violation, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<TokenPair, AppError> {
    let service = TokenService::from_ref(state);
    let access_token = service.sign_access(user_id)?;
    let refresh_token = service.sign_refresh(user_id)?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    // Pre-check for a friendly 409; the unique index still closes the race.
    if repo::find_user_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = password::hash_password(&payload.password, state.config.bcrypt_cost)?;

    let user = match repo::insert_user(
        &state.db,
        &payload.email,
        &hash,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(AppError::Db(e)),
    };

    let verification_code = code::generate_code();
    let expires_at = OffsetDateTime::now_utc() + CodeKind::EmailVerification.ttl();
    repo::insert_verification_code(
        &state.db,
        user.id,
        &verification_code,
        CodeKind::EmailVerification,
        expires_at,
    )
    .await?;
    if let Err(e) = state
        .mailer
        .send_verification_code(&user.email, &verification_code)
        .await
    {
        error!(error = %e, user_id = %user.id, "verification email failed");
    }

    let tokens = issue_tokens(&state, user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            tokens,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    // Unknown email and wrong password answer identically.
    let user = repo::find_user_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            AppError::Unauthorized("Invalid email or password".into())
        })?;

    if !password::verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    repo::touch_last_login(&state.db, user.id).await?;

    let tokens = issue_tokens(&state, user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    // Unknown email and bad code answer identically.
    let user = repo::find_user_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "verify email unknown user");
            AppError::BadRequest("Invalid or expired verification code".into())
        })?;

    if !repo::verify_email(&state.db, user.id, &payload.code).await? {
        warn!(user_id = %user.id, "verification code rejected");
        return Err(AppError::BadRequest(
            "Invalid or expired verification code".into(),
        ));
    }

    info!(user_id = %user.id, "email verified");
    Ok(Json(MessageResponse {
        message: "Email verified successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    // The response never reveals whether the account exists.
    if let Some(user) = repo::find_user_by_email(&state.db, &payload.email).await? {
        let reset_code = code::generate_code();
        let expires_at = OffsetDateTime::now_utc() + CodeKind::PasswordReset.ttl();
        repo::insert_verification_code(
            &state.db,
            user.id,
            &reset_code,
            CodeKind::PasswordReset,
            expires_at,
        )
        .await?;
        if let Err(e) = state
            .mailer
            .send_password_reset_code(&user.email, &reset_code)
            .await
        {
            error!(error = %e, user_id = %user.id, "password reset email failed");
        }
        info!(user_id = %user.id, "password reset code issued");
    }

    Ok(Json(MessageResponse {
        message: "If the email exists, a reset code has been sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    let user = repo::find_user_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "reset password unknown user");
            AppError::BadRequest("Invalid or expired reset code".into())
        })?;

    let hash = password::hash_password(&payload.new_password, state.config.bcrypt_cost)?;

    if !repo::reset_password(&state.db, user.id, &payload.code, &hash).await? {
        warn!(user_id = %user.id, "reset code rejected");
        return Err(AppError::BadRequest("Invalid or expired reset code".into()));
    }

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "Password reset successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokensResponse>, AppError> {
    let service = TokenService::from_ref(&state);
    let claims = service.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::Unauthorized("Invalid refresh token".into())
    })?;

    // The account must still exist before a new pair is minted.
    let user = repo::find_user_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "refresh for missing user");
            AppError::Unauthorized("Invalid refresh token".into())
        })?;

    let tokens = issue_tokens(&state, user.id)?;
    info!(user_id = %user.id, "tokens refreshed");
    Ok(Json(TokensResponse { tokens }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = repo::find_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(UserResponse { user: user.into() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::SubscriptionStatus;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .merge(auth_routes())
            .merge(me_routes())
            .with_state(AppState::fake())
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_with_invalid_email_is_rejected_before_any_lookup() {
        let response = post_json(
            app(),
            "/auth/register",
            serde_json::json!({
                "email": "not-an-email",
                "password": "Str0ngPass",
                "confirmPassword": "Str0ngPass"
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Validation failed");
        assert!(body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["field"] == "email"));
    }

    #[tokio::test]
    async fn register_reports_mismatched_confirmation_in_camel_case() {
        let response = post_json(
            app(),
            "/auth/register",
            serde_json::json!({
                "email": "coach@example.com",
                "password": "Str0ngPass",
                "confirmPassword": "0therPass1"
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["field"] == "confirmPassword"));
    }

    #[tokio::test]
    async fn login_with_missing_password_reports_field_error() {
        let response = post_json(
            app(),
            "/auth/login",
            serde_json::json!({ "email": "coach@example.com" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["field"] == "password" && e["message"] == "Password is required"));
    }

    #[tokio::test]
    async fn verify_email_rejects_malformed_code() {
        let response = post_json(
            app(),
            "/auth/verify-email",
            serde_json::json!({ "email": "coach@example.com", "code": "12ab56" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["field"] == "code"));
    }

    #[tokio::test]
    async fn refresh_with_garbage_token_is_unauthorized() {
        let response = post_json(
            app(),
            "/auth/refresh",
            serde_json::json!({ "refreshToken": "garbage" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid refresh token");
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens() {
        let state = AppState::fake();
        let access = TokenService::from_ref(&state)
            .sign_access(Uuid::new_v4())
            .unwrap();
        let response = post_json(
            app(),
            "/auth/refresh",
            serde_json::json!({ "refreshToken": access }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_with_missing_token_is_unauthorized() {
        let response = post_json(app(), "/auth/refresh", serde_json::json!({})).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn auth_response_nests_user_and_tokens() {
        let now = time::macros::datetime!(2024-03-01 09:30:00 UTC);
        let response = AuthResponse {
            user: crate::auth::dto::UserSummary {
                id: Uuid::new_v4(),
                email: "coach@example.com".into(),
                first_name: None,
                last_name: None,
                email_verified: false,
                subscription_status: SubscriptionStatus::Trial,
                trial_ends_at: None,
                created_at: now,
            },
            tokens: TokenPair {
                access_token: "aaa".into(),
                refresh_token: "rrr".into(),
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["user"]["email"], "coach@example.com");
        assert_eq!(value["tokens"]["accessToken"], "aaa");
        assert!(value["user"].get("passwordHash").is_none());
    }
}
