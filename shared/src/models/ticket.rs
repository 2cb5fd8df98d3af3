use crate::dto::lenient::first_timestamp;
use crate::dto::ticket::TicketRecord;
use crate::models::status::RowStatus;
use crate::resource::{format_day, ListResource, ListRow, RowAction};
use crate::season::{derive_season, SeasonTag};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::borrow::Cow;

pub const UNKNOWN_CUSTOMER: &str = "Unknown customer";

/// Ticket purchase ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRow {
    pub id: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_id: Option<String>,
    pub package: String,
    pub title: String,
    pub amount: f64,
    pub quantity: u32,
    pub status: RowStatus,
    pub season: SeasonTag,
    pub purchased_at: Option<NaiveDateTime>,
}

impl From<TicketRecord> for TicketRow {
    fn from(record: TicketRecord) -> Self {
        let purchased_at = first_timestamp(&[
            record.purchased_at.as_deref(),
            record.processed_at.as_deref(),
            record.created_at.as_deref(),
        ]);
        let season = derive_season(
            record.season.as_deref(),
            record.year,
            record.title.as_deref(),
            purchased_at.map(|dt| dt.date()),
        );
        let customer_email = record
            .customer_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let customer_name = record
            .customer_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .or_else(|| customer_email.clone())
            .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string());

        Self {
            id: record.id,
            customer_name,
            customer_email,
            customer_id: record.customer_id,
            package: record.package.unwrap_or_default(),
            title: record.title.unwrap_or_default(),
            amount: record.amount.unwrap_or(0.0),
            quantity: record.quantity.unwrap_or(1),
            status: RowStatus::parse_or(record.status.as_deref(), RowStatus::Completed),
            season,
            purchased_at,
        }
    }
}

impl ListRow for TicketRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Customer", "Package", "Season", "Qty", "Amount", "Status", "Purchased"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.customer_name.clone(),
            self.package.clone(),
            self.season.label(),
            self.quantity.to_string(),
            format!("{:.2}", self.amount),
            self.status.to_string(),
            format_day(self.purchased_at),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "customer" => Some(Cow::Owned(format!(
                "{} {}",
                self.customer_name,
                self.customer_email.as_deref().unwrap_or_default()
            ))),
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "package" => Some(Cow::Borrowed(&self.package)),
            "season" => Some(Cow::Owned(self.season.label())),
            "year" => Some(Cow::Owned(
                self.season.year.map(|y| y.to_string()).unwrap_or_default(),
            )),
            "title" | "event" => Some(Cow::Borrowed(&self.title)),
            _ => None,
        }
    }

    fn occurred_at(&self) -> Option<NaiveDateTime> {
        self.purchased_at
    }

    fn display_name(&self) -> &str {
        &self.customer_name
    }

    fn amount(&self) -> f64 {
        self.amount
    }

    fn is_settled(&self) -> bool {
        self.status == RowStatus::Completed
    }

    fn customer_key(&self) -> Option<String> {
        self.customer_id
            .clone()
            .or_else(|| self.customer_email.as_ref().map(|e| e.to_lowercase()))
            .or_else(|| {
                (self.customer_name != UNKNOWN_CUSTOMER).then(|| self.customer_name.to_lowercase())
            })
    }
}

/// Ticket sales list.
pub struct Tickets;

impl ListResource for Tickets {
    type Record = TicketRecord;
    type Row = TicketRow;

    const NAME: &'static str = "tickets";
    const PATH: &'static str = "/api/admin/tickets";
    const COLLECTION: &'static str = "tickets";
    const ACTIONS: &'static [RowAction] = &[
        RowAction::View,
        RowAction::Edit,
        RowAction::Delete,
        RowAction::Export,
    ];

    fn normalize(record: TicketRecord) -> TicketRow {
        TicketRow::from(record)
    }
}
