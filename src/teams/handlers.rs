use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        dto::MessageResponse,
        extractors::{AuthUser, SubscribedUser},
    },
    error::AppError,
    state::AppState,
};

use super::{
    dto::{CreatePlayerRequest, PlayerResponse, TeamPayload, TeamResponse, UpdatePlayerRequest},
    repo,
};

pub fn team_routes() -> Router<AppState> {
    Router::new()
        .route("/teams", get(list_teams).post(create_team))
        .route(
            "/teams/:id",
            get(get_team).put(update_team).delete(delete_team),
        )
        .route("/teams/:id/players", get(list_team_players))
}

pub fn player_routes() -> Router<AppState> {
    Router::new()
        .route("/players", post(create_player))
        .route(
            "/players/:id",
            get(get_player).put(update_player).delete(delete_player),
        )
}

/// Loads a team and enforces ownership. A missing row is 404; somebody
/// else's row is 403, so ids cannot be probed for existence ambiguity.
async fn owned_team(
    state: &AppState,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<repo::Team, AppError> {
    let team = repo::find_team(&state.db, team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
    if team.user_id != user_id {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(team)
}

/// Same contract as [`owned_team`], one join further out: the player's
/// team decides who may touch the player.
async fn owned_player(
    state: &AppState,
    player_id: Uuid,
    user_id: Uuid,
) -> Result<repo::Player, AppError> {
    let player = repo::find_player(&state.db, player_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".into()))?;
    let owner = repo::team_owner(&state.db, player.team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
    if owner != user_id {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(player)
}

#[instrument(skip(state))]
pub async fn list_teams(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TeamResponse>>, AppError> {
    let teams = repo::list_teams(&state.db, user_id).await?;
    Ok(Json(teams.into_iter().map(TeamResponse::from).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn create_team(
    State(state): State<AppState>,
    SubscribedUser(user): SubscribedUser,
    Json(payload): Json<TeamPayload>,
) -> Result<(StatusCode, Json<TeamResponse>), AppError> {
    payload.validate()?;

    let team = repo::insert_team(&state.db, user.id, &payload).await?;
    info!(team_id = %team.id, user_id = %user.id, "team created");
    Ok((StatusCode::CREATED, Json(team.into())))
}

#[instrument(skip(state))]
pub async fn get_team(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamResponse>, AppError> {
    let team = owned_team(&state, team_id, user_id).await?;
    Ok(Json(team.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_team(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<TeamPayload>,
) -> Result<Json<TeamResponse>, AppError> {
    payload.validate()?;

    owned_team(&state, team_id, user_id).await?;
    let team = repo::update_team(&state.db, team_id, &payload).await?;
    info!(team_id = %team.id, "team updated");
    Ok(Json(team.into()))
}

#[instrument(skip(state))]
pub async fn delete_team(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    owned_team(&state, team_id, user_id).await?;
    repo::delete_team(&state.db, team_id).await?;
    info!(%team_id, "team deleted");
    Ok(Json(MessageResponse {
        message: "Team deleted".into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_team_players(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<PlayerResponse>>, AppError> {
    owned_team(&state, team_id, user_id).await?;
    let players = repo::list_players(&state.db, team_id).await?;
    Ok(Json(
        players.into_iter().map(PlayerResponse::from).collect(),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_player(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerResponse>), AppError> {
    payload.validate()?;

    let team_id = payload
        .team_id
        .ok_or_else(|| AppError::BadRequest("Team is required".into()))?;
    let owner = repo::team_owner(&state.db, team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
    if owner != user_id {
        return Err(AppError::Forbidden("Access denied".into()));
    }

    let player = repo::insert_player(&state.db, team_id, &payload).await?;
    info!(player_id = %player.id, %team_id, "player created");
    Ok((StatusCode::CREATED, Json(player.into())))
}

#[instrument(skip(state))]
pub async fn get_player(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(player_id): Path<Uuid>,
) -> Result<Json<PlayerResponse>, AppError> {
    let player = owned_player(&state, player_id, user_id).await?;
    Ok(Json(player.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_player(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(player_id): Path<Uuid>,
    Json(payload): Json<UpdatePlayerRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    payload.validate()?;

    owned_player(&state, player_id, user_id).await?;
    let player = repo::update_player(&state.db, player_id, &payload).await?;
    info!(player_id = %player.id, "player updated");
    Ok(Json(player.into()))
}

#[instrument(skip(state))]
pub async fn delete_player(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(player_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    owned_player(&state, player_id, user_id).await?;
    repo::delete_player(&state.db, player_id).await?;
    info!(%player_id, "player deleted");
    Ok(Json(MessageResponse {
        message: "Player deleted".into(),
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
        let app = Router::new()
            .merge(team_routes())
            .merge(player_routes())
            .with_state(state.clone());
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
    async fn team_routes_require_a_token() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/teams").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_team_rejects_a_blank_name_before_any_lookup() {
        let (app, state) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/teams/{}", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, bearer(&state))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::json!({ "name": "" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["field"], "name");
        assert_eq!(body["errors"][0]["message"], "Team name is required");
    }

    #[tokio::test]
    async fn create_player_reports_every_missing_field() {
        let (app, state) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/players")
                    .header(header::AUTHORIZATION, bearer(&state))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::json!({}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Validation failed");
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"teamId"));
        assert!(fields.contains(&"firstName"));
        assert!(fields.contains(&"lastName"));
        assert!(fields.contains(&"position"));
    }

    #[tokio::test]
    async fn player_routes_reject_malformed_ids() {
        let (app, state) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/players/not-a-uuid")
                    .header(header::AUTHORIZATION, bearer(&state))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_player_requires_a_token() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/players/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
