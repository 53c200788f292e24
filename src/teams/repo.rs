use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::dto::{CreatePlayerRequest, TeamPayload, UpdatePlayerRequest};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub level: Option<String>,
    pub season: Option<String>,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Player {
    pub id: Uuid,
    pub team_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub status: String,
    pub birth_date: Option<Date>,
    pub license_number: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn list_teams(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Team>> {
    let rows = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, user_id, name, category, level, season, description, created_at, updated_at
        FROM teams
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list teams")?;
    Ok(rows)
}

/// Fetch by id alone; the caller decides between 404 and 403.
pub async fn find_team(db: &PgPool, team_id: Uuid) -> anyhow::Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, user_id, name, category, level, season, description, created_at, updated_at
        FROM teams
        WHERE id = $1
        "#,
    )
    .bind(team_id)
    .fetch_optional(db)
    .await
    .context("find team")?;
    Ok(team)
}

/// Owning user of a team, if the team exists.
pub async fn team_owner(db: &PgPool, team_id: Uuid) -> anyhow::Result<Option<Uuid>> {
    let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(db)
        .await
        .context("team owner")?;
    Ok(owner)
}

pub async fn insert_team(db: &PgPool, user_id: Uuid, req: &TeamPayload) -> anyhow::Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        INSERT INTO teams (user_id, name, category, level, season, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, name, category, level, season, description, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.category)
    .bind(&req.level)
    .bind(&req.season)
    .bind(&req.description)
    .fetch_one(db)
    .await
    .context("insert team")?;
    Ok(team)
}

pub async fn update_team(db: &PgPool, team_id: Uuid, req: &TeamPayload) -> anyhow::Result<Team> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        UPDATE teams
           SET name = $2, category = $3, level = $4, season = $5, description = $6,
               updated_at = now()
         WHERE id = $1
        RETURNING id, user_id, name, category, level, season, description, created_at, updated_at
        "#,
    )
    .bind(team_id)
    .bind(&req.name)
    .bind(&req.category)
    .bind(&req.level)
    .bind(&req.season)
    .bind(&req.description)
    .fetch_one(db)
    .await
    .context("update team")?;
    Ok(team)
}

pub async fn delete_team(db: &PgPool, team_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(team_id)
        .execute(db)
        .await
        .context("delete team")?;
    Ok(())
}

pub async fn list_players(db: &PgPool, team_id: Uuid) -> anyhow::Result<Vec<Player>> {
    let rows = sqlx::query_as::<_, Player>(
        r#"
        SELECT id, team_id, first_name, last_name, position, status, birth_date,
               license_number, created_at, updated_at
        FROM players
        WHERE team_id = $1
        ORDER BY last_name ASC, first_name ASC
        "#,
    )
    .bind(team_id)
    .fetch_all(db)
    .await
    .context("list players")?;
    Ok(rows)
}

pub async fn find_player(db: &PgPool, player_id: Uuid) -> anyhow::Result<Option<Player>> {
    let player = sqlx::query_as::<_, Player>(
        r#"
        SELECT id, team_id, first_name, last_name, position, status, birth_date,
               license_number, created_at, updated_at
        FROM players
        WHERE id = $1
        "#,
    )
    .bind(player_id)
    .fetch_optional(db)
    .await
    .context("find player")?;
    Ok(player)
}

pub async fn insert_player(
    db: &PgPool,
    team_id: Uuid,
    req: &CreatePlayerRequest,
) -> anyhow::Result<Player> {
    let player = sqlx::query_as::<_, Player>(
        r#"
        INSERT INTO players (team_id, first_name, last_name, position, status, birth_date, license_number)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, team_id, first_name, last_name, position, status, birth_date,
                  license_number, created_at, updated_at
        "#,
    )
    .bind(team_id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.position)
    .bind(&req.status)
    .bind(req.birth_date)
    .bind(&req.license_number)
    .fetch_one(db)
    .await
    .context("insert player")?;
    Ok(player)
}

pub async fn update_player(
    db: &PgPool,
    player_id: Uuid,
    req: &UpdatePlayerRequest,
) -> anyhow::Result<Player> {
    let player = sqlx::query_as::<_, Player>(
        r#"
        UPDATE players
           SET first_name = $2, last_name = $3, position = $4, status = $5,
               birth_date = $6, license_number = $7, updated_at = now()
         WHERE id = $1
        RETURNING id, team_id, first_name, last_name, position, status, birth_date,
                  license_number, created_at, updated_at
        "#,
    )
    .bind(player_id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.position)
    .bind(&req.status)
    .bind(req.birth_date)
    .bind(&req.license_number)
    .fetch_one(db)
    .await
    .context("update player")?;
    Ok(player)
}

pub async fn delete_player(db: &PgPool, player_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM players WHERE id = $1")
        .bind(player_id)
        .execute(db)
        .await
        .context("delete player")?;
    Ok(())
}
