use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;
use validator::Validate;

use super::repo::{Player, Team};

time::serde::format_description!(birth_date_format, Date, "[year]-[month]-[day]");

fn default_status() -> String {
    "available".into()
}

/// Body shared by team create and update; PUT replaces the whole record.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamPayload {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Team name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Category is too long"))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "Level is too long"))]
    pub level: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "Season is too long"))]
    pub season: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub level: Option<String>,
    pub season: Option<String>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            category: team.category,
            level: team.level,
            season: team.season,
            description: team.description,
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayerRequest {
    #[validate(required(message = "Team is required"))]
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Position is required"))]
    pub position: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, with = "birth_date_format::option")]
    pub birth_date: Option<Date>,
    #[serde(default)]
    #[validate(length(max = 50, message = "License number is too long"))]
    pub license_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Position is required"))]
    pub position: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, with = "birth_date_format::option")]
    pub birth_date: Option<Date>,
    #[serde(default)]
    #[validate(length(max = 50, message = "License number is too long"))]
    pub license_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub status: String,
    #[serde(with = "birth_date_format::option")]
    pub birth_date: Option<Date>,
    pub license_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Player> for PlayerResponse {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            team_id: player.team_id,
            first_name: player.first_name,
            last_name: player.last_name,
            position: player.position,
            status: player.status,
            birth_date: player.birth_date,
            license_number: player.license_number,
            created_at: player.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_payload_requires_a_name() {
        let payload: TeamPayload = serde_json::from_value(serde_json::json!({})).unwrap();
        let err = payload.validate().unwrap_err();
        assert!(err.field_errors().contains_key("name"));
    }

    #[test]
    fn team_payload_accepts_optional_fields() {
        let payload: TeamPayload = serde_json::from_value(serde_json::json!({
            "name": "Seniors A",
            "category": "senior",
            "level": "regional",
            "season": "2024-2025"
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.season.as_deref(), Some("2024-2025"));
        assert!(payload.description.is_none());
    }

    #[test]
    fn player_request_parses_birth_date_and_defaults_status() {
        let req: CreatePlayerRequest = serde_json::from_value(serde_json::json!({
            "teamId": Uuid::new_v4(),
            "firstName": "Lea",
            "lastName": "Durand",
            "position": "libero",
            "birthDate": "2001-06-15"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.status, "available");
        let birth = req.birth_date.unwrap();
        assert_eq!((birth.year(), birth.month() as u8, birth.day()), (2001, 6, 15));
    }

    #[test]
    fn player_request_requires_team_and_position() {
        let req: CreatePlayerRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Lea",
            "lastName": "Durand"
        }))
        .unwrap();
        let err = req.validate().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("team_id"));
        assert!(fields.contains_key("position"));
    }

    #[test]
    fn player_response_serializes_camel_case() {
        let now = time::macros::datetime!(2024-02-10 08:00:00 UTC);
        let response = PlayerResponse {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            first_name: "Lea".into(),
            last_name: "Durand".into(),
            position: "passeur".into(),
            status: "available".into(),
            birth_date: Some(time::macros::date!(2001 - 06 - 15)),
            license_number: Some("FFV-123".into()),
            created_at: now,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["firstName"], "Lea");
        assert_eq!(value["birthDate"], "2001-06-15");
        assert_eq!(value["licenseNumber"], "FFV-123");
        assert_eq!(value["createdAt"], "2024-02-10T08:00:00Z");
    }
}
