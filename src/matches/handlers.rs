use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        dto::MessageResponse,
        extractors::{AuthUser, VerifiedUser},
    },
    error::AppError,
    state::AppState,
    teams::repo::team_owner,
};

use super::{
    dto::{CreateMatchRequest, MatchListQuery, MatchResponse, UpdateMatchRequest},
    repo,
};

pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route(
            "/matches/:id",
            get(get_match).put(update_match).delete(delete_match),
        )
}

/// Loads a match and enforces ownership through its team. Missing match
/// is 404; a match on somebody else's team is 403.
async fn owned_match(
    state: &AppState,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<repo::Match, AppError> {
    let m = repo::find_match(&state.db, match_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Match not found".into()))?;
    let owner = team_owner(&state.db, m.team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
    if owner != user_id {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(m)
}

#[instrument(skip(state))]
pub async fn list_matches(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<Vec<MatchResponse>>, AppError> {
    // The team filter is scoped to the caller inside the query itself, so a
    // foreign teamId just produces an empty list.
    let matches = repo::list_matches(
        &state.db,
        user_id,
        query.team_id,
        query.limit,
        query.offset,
    )
    .await?;
    Ok(Json(matches.into_iter().map(MatchResponse::from).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn create_match(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), AppError> {
    payload.validate()?;

    let team_id = payload
        .team_id
        .ok_or_else(|| AppError::BadRequest("Team is required".into()))?;
    let match_date = payload
        .match_date
        .ok_or_else(|| AppError::BadRequest("Match date is required".into()))?;
    let owner = team_owner(&state.db, team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
    if owner != user.id {
        return Err(AppError::Forbidden("Access denied".into()));
    }

    let m = repo::insert_match(&state.db, team_id, match_date, &payload).await?;
    info!(match_id = %m.id, %team_id, "match created");
    Ok((StatusCode::CREATED, Json(m.into())))
}

#[instrument(skip(state))]
pub async fn get_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    let m = owned_match(&state, match_id, user_id).await?;
    Ok(Json(m.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(match_id): Path<Uuid>,
    Json(payload): Json<UpdateMatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    payload.validate()?;

    let match_date = payload
        .match_date
        .ok_or_else(|| AppError::BadRequest("Match date is required".into()))?;
    owned_match(&state, match_id, user_id).await?;
    let m = repo::update_match(&state.db, match_id, match_date, &payload).await?;
    info!(match_id = %m.id, "match updated");
    Ok(Json(m.into()))
}

#[instrument(skip(state))]
pub async fn delete_match(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    owned_match(&state, match_id, user_id).await?;
    repo::delete_match(&state.db, match_id).await?;
    info!(%match_id, "match deleted");
    Ok(Json(MessageResponse {
        message: "Match deleted".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::FromRef;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::auth::jwt::TokenService;

    fn app() -> (Router, AppState) {
        let state = AppState::fake();
        let app = Router::new().merge(match_routes()).with_state(state.clone());
        (app, state)
    }

    fn bearer(state: &AppState) -> String {
        let token = TokenService::from_ref(state).sign_access(Uuid::new_v4()).unwrap();
        format!("Bearer {token}")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn match_routes_require_a_token() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/matches")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_match_rejects_a_bad_date_before_any_lookup() {
        let (app, state) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/matches/{}", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, bearer(&state))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "opponentName": "VC Rivals", "matchDate": "next tuesday" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        // A date serde cannot parse never reaches validation.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn update_match_reports_missing_fields() {
        let (app, state) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/matches/{}", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, bearer(&state))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::json!({}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"opponentName"));
        assert!(fields.contains(&"matchDate"));
    }

    #[tokio::test]
    async fn list_matches_rejects_refresh_tokens() {
        let (app, state) = app();
        let token = TokenService::from_ref(&state)
            .sign_refresh(Uuid::new_v4())
            .unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/matches")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
