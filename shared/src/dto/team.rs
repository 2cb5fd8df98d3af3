use crate::dto::lenient::{self, FieldVariants};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

static GENDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(boys|girls|coed)$").expect("gender pattern is valid"));

/// Team roster entry as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub grade: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub coach: Option<String>,
    #[serde(default)]
    pub tournament: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub player_count: Option<u32>,
    #[serde(default)]
    pub players: Option<Vec<Value>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl FieldVariants for TeamRecord {
    const VARIANTS: &'static [(&'static str, &'static [&'static str])] = &[
        ("id", &["_id"]),
        ("name", &["teamName", "team_name"]),
        ("coach", &["coachName", "coach_name"]),
        ("tournament", &["tournamentName", "tournament_name"]),
        ("playerCount", &["player_count", "rosterSize"]),
        ("createdAt", &["created_at"]),
    ];
}

/// Create or edit form for a team.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamForm {
    #[validate(length(min = 1, max = 100, message = "Team name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "Grade is required"))]
    pub grade: String,
    #[validate(regex(path = "GENDER_REGEX", message = "Gender must be boys, girls or coed"))]
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub coach: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 2000, max = 2100, message = "Year looks wrong"))]
    pub year: Option<i32>,
}
