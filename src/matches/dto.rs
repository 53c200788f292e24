use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::repo::Match;

fn default_is_home() -> bool {
    true
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    #[validate(required(message = "Team is required"))]
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Opponent name is required"))]
    pub opponent_name: String,
    #[validate(required(message = "Match date is required"))]
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub match_date: Option<OffsetDateTime>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Location is too long"))]
    pub location: Option<String>,
    #[serde(default = "default_is_home")]
    pub is_home: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatchRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Opponent name is required"))]
    pub opponent_name: String,
    #[validate(required(message = "Match date is required"))]
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub match_date: Option<OffsetDateTime>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Location is too long"))]
    pub location: Option<String>,
    #[serde(default = "default_is_home")]
    pub is_home: bool,
}

/// Query string for `GET /matches`; `flatten` does not survive the urlencoded
/// deserializer, so the pagination fields are declared inline.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchListQuery {
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub opponent_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    pub location: Option<String>,
    pub is_home: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Match> for MatchResponse {
    fn from(m: Match) -> Self {
        Self {
            id: m.id,
            team_id: m.team_id,
            opponent_name: m.opponent_name,
            match_date: m.match_date,
            location: m.location,
            is_home: m.is_home,
            created_at: m.created_at,
        }
    }
}
