use crate::dto::lenient::first_timestamp;
use crate::dto::registration::RegistrationRecord;
use crate::models::status::RowStatus;
use crate::resource::{format_day, ListResource, ListRow, RowAction};
use crate::season::{derive_season, SeasonTag};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRow {
    pub id: String,
    pub team_name: String,
    pub tournament: String,
    pub grade: String,
    pub gender: String,
    pub contact_name: String,
    pub contact_email: Option<String>,
    pub amount: f64,
    pub status: RowStatus,
    pub season: SeasonTag,
    pub registered_at: Option<NaiveDateTime>,
}

impl From<RegistrationRecord> for RegistrationRow {
    fn from(record: RegistrationRecord) -> Self {
        let registered_at = first_timestamp(&[
            record.registered_at.as_deref(),
            record.created_at.as_deref(),
        ]);
        let season = derive_season(
            record.season.as_deref(),
            record.year,
            record.tournament.as_deref(),
            registered_at.map(|dt| dt.date()),
        );
        let contact_email = record
            .contact_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Self {
            id: record.id,
            team_name: record.team_name.unwrap_or_default(),
            tournament: record.tournament.unwrap_or_default(),
            grade: record.grade.unwrap_or_default(),
            gender: record.gender.unwrap_or_default(),
            contact_name: record.contact_name.unwrap_or_default(),
            contact_email,
            amount: record.amount.unwrap_or(0.0),
            status: RowStatus::parse_or(record.status.as_deref(), RowStatus::Pending),
            season,
            registered_at,
        }
    }
}

impl ListRow for RegistrationRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Team", "Tournament", "Grade", "Contact", "Amount", "Status", "Registered"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.team_name.clone(),
            self.tournament.clone(),
            self.grade.clone(),
            self.contact_name.clone(),
            format!("{:.2}", self.amount),
            self.status.to_string(),
            format_day(self.registered_at),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "team" => Some(Cow::Borrowed(&self.team_name)),
            "tournament" => Some(Cow::Borrowed(&self.tournament)),
            "grade" => Some(Cow::Borrowed(&self.grade)),
            "gender" => Some(Cow::Borrowed(&self.gender)),
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "season" => Some(Cow::Owned(self.season.label())),
            "customer" | "contact" => Some(Cow::Owned(format!(
                "{} {}",
                self.contact_name,
                self.contact_email.as_deref().unwrap_or_default()
            ))),
            _ => None,
        }
    }

    fn occurred_at(&self) -> Option<NaiveDateTime> {
        self.registered_at
    }

    fn display_name(&self) -> &str {
        &self.team_name
    }

    fn amount(&self) -> f64 {
        self.amount
    }

    fn is_settled(&self) -> bool {
        matches!(self.status, RowStatus::Paid | RowStatus::Completed)
    }

    fn customer_key(&self) -> Option<String> {
        self.contact_email
            .as_ref()
            .map(|e| e.to_lowercase())
            .or_else(|| {
                let name = self.contact_name.trim();
                (!name.is_empty()).then(|| name.to_lowercase())
            })
    }
}

/// Tournament registrations list.
pub struct Registrations;

impl ListResource for Registrations {
    type Record = RegistrationRecord;
    type Row = RegistrationRow;

    const NAME: &'static str = "registrations";
    const PATH: &'static str = "/api/admin/registrations";
    const COLLECTION: &'static str = "registrations";
    const ACTIONS: &'static [RowAction] = &[
        RowAction::View,
        RowAction::Edit,
        RowAction::Delete,
        RowAction::Export,
    ];

    fn normalize(record: RegistrationRecord) -> RegistrationRow {
        RegistrationRow::from(record)
    }
}
