use crate::dto::lenient::{self, FieldVariants};
use serde::{Deserialize, Serialize};

/// Tournament registration as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub tournament: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub grade: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub year: Option<i32>,
    #[serde(default)]
    pub registered_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl FieldVariants for RegistrationRecord {
    const VARIANTS: &'static [(&'static str, &'static [&'static str])] = &[
        ("id", &["_id"]),
        ("teamName", &["team", "team_name"]),
        ("tournament", &["tournamentName", "tournament_name", "tournamentTitle"]),
        ("contactName", &["parentName", "customerName", "contact_name"]),
        ("contactEmail", &["parentEmail", "customerEmail", "contact_email"]),
        ("amount", &["amountPaid", "fee"]),
        ("status", &["paymentStatus"]),
        ("registeredAt", &["registered_at"]),
        ("createdAt", &["created_at"]),
    ];
}
