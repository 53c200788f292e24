use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{CreateMatchRequest, UpdateMatchRequest};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub team_id: Uuid,
    pub opponent_name: String,
    pub match_date: OffsetDateTime,
    pub location: Option<String>,
    pub is_home: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Lists matches across all of the user's teams, newest fixture first.
/// `team_id` narrows the list to one team when given.
pub async fn list_matches(
    db: &PgPool,
    user_id: Uuid,
    team_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Match>> {
    let rows = sqlx::query_as::<_, Match>(
        r#"
        SELECT m.id, m.team_id, m.opponent_name, m.match_date, m.location,
               m.is_home, m.created_at, m.updated_at
        FROM matches m
        JOIN teams t ON t.id = m.team_id
        WHERE t.user_id = $1
          AND ($2::uuid IS NULL OR m.team_id = $2)
        ORDER BY m.match_date DESC
        LIMIT $3 OFFSET $4
    "#,
    )
    .bind(user_id)
    .bind(team_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list matches")?;
    Ok(rows)
}

pub async fn find_match(db: &PgPool, match_id: Uuid) -> anyhow::Result<Option<Match>> {
    let row = sqlx::query_as::<_, Match>(
        r#"
        SELECT id, team_id, opponent_name, match_date, location,
               is_home, created_at, updated_at
        FROM matches
        WHERE id = $1
    "#,
    )
    .bind(match_id)
    .fetch_optional(db)
    .await
    .context("find match")?;
    Ok(row)
}

pub async fn insert_match(
    db: &PgPool,
    team_id: Uuid,
    match_date: OffsetDateTime,
    req: &CreateMatchRequest,
) -> anyhow::Result<Match> {
    let row = sqlx::query_as::<_, Match>(
        r#"
        INSERT INTO matches (team_id, opponent_name, match_date, location, is_home)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, team_id, opponent_name, match_date, location,
                  is_home, created_at, updated_at
        "#,
    )
    .bind(team_id)
    .bind(&req.opponent_name)
    .bind(match_date)
    .bind(&req.location)
    .bind(req.is_home)
    .fetch_one(db)
    .await
    .context("insert match")?;
    Ok(row)
}

pub async fn update_match(
    db: &PgPool,
    match_id: Uuid,
    match_date: OffsetDateTime,
    req: &UpdateMatchRequest,
) -> anyhow::Result<Match> {
    let row = sqlx::query_as::<_, Match>(
        r#"
        UPDATE matches
           SET opponent_name = $2, match_date = $3, location = $4,
               is_home = $5, updated_at = now()
         WHERE id = $1
        RETURNING id, team_id, opponent_name, match_date, location,
                  is_home, created_at, updated_at
        "#,
    )
    .bind(match_id)
    .bind(&req.opponent_name)
    .bind(match_date)
    .bind(&req.location)
    .bind(req.is_home)
    .fetch_one(db)
    .await
    .context("update match")?;
    Ok(row)
}

pub async fn delete_match(db: &PgPool, match_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM matches WHERE id = $1")
        .bind(match_id)
        .execute(db)
        .await
        .context("delete match")?;
    Ok(())
}
