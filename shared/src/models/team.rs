use crate::dto::lenient::parse_timestamp;
use crate::dto::team::TeamRecord;
use crate::resource::{ListResource, ListRow, RowAction};
use crate::season::{derive_season, SeasonTag};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRow {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub gender: String,
    pub coach: String,
    pub tournament: String,
    pub season: SeasonTag,
    pub player_count: u32,
    pub created_at: Option<NaiveDateTime>,
}

impl From<TeamRecord> for TeamRow {
    fn from(record: TeamRecord) -> Self {
        let created_at = record.created_at.as_deref().and_then(parse_timestamp);
        let season = derive_season(
            record.season.as_deref(),
            record.year,
            record.tournament.as_deref(),
            created_at.map(|dt| dt.date()),
        );
        // An explicit count wins; otherwise count the embedded roster.
        let player_count = record
            .player_count
            .or_else(|| record.players.as_ref().map(|p| p.len() as u32))
            .unwrap_or(0);

        Self {
            id: record.id,
            name: record.name.unwrap_or_else(|| "Unnamed team".to_string()),
            grade: record.grade.unwrap_or_default(),
            gender: record.gender.unwrap_or_default(),
            coach: record.coach.unwrap_or_default(),
            tournament: record.tournament.unwrap_or_default(),
            season,
            player_count,
            created_at,
        }
    }
}

impl ListRow for TeamRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Team", "Grade", "Gender", "Coach", "Season", "Players"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.grade.clone(),
            self.gender.clone(),
            self.coach.clone(),
            self.season.label(),
            self.player_count.to_string(),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "team" | "name" => Some(Cow::Borrowed(&self.name)),
            "grade" => Some(Cow::Borrowed(&self.grade)),
            "gender" => Some(Cow::Borrowed(&self.gender)),
            "coach" => Some(Cow::Borrowed(&self.coach)),
            "tournament" => Some(Cow::Borrowed(&self.tournament)),
            "season" => Some(Cow::Owned(self.season.label())),
            _ => None,
        }
    }

    fn occurred_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Team roster list.
pub struct Teams;

impl ListResource for Teams {
    type Record = TeamRecord;
    type Row = TeamRow;

    const NAME: &'static str = "teams";
    const PATH: &'static str = "/api/admin/teams";
    const COLLECTION: &'static str = "teams";
    const ACTIONS: &'static [RowAction] = &[
        RowAction::View,
        RowAction::Edit,
        RowAction::Delete,
        RowAction::Export,
    ];

    fn normalize(record: TeamRecord) -> TeamRow {
        TeamRow::from(record)
    }
}
