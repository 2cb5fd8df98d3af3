use crate::dto::lenient::first_timestamp;
use crate::dto::refund::RefundRecord;
use crate::models::status::RowStatus;
use crate::models::ticket::UNKNOWN_CUSTOMER;
use crate::resource::{format_day, ListResource, ListRow, RowAction};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRow {
    pub id: String,
    pub ticket_id: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub amount: f64,
    pub reason: String,
    pub status: RowStatus,
    pub requested_at: Option<NaiveDateTime>,
    pub processed_at: Option<NaiveDateTime>,
}

impl RefundRow {
    /// Only pending requests can still be approved or denied.
    pub fn is_decidable(&self) -> bool {
        self.status == RowStatus::Pending
    }
}

impl From<RefundRecord> for RefundRow {
    fn from(record: RefundRecord) -> Self {
        let requested_at = first_timestamp(&[
            record.requested_at.as_deref(),
            record.created_at.as_deref(),
        ]);
        let processed_at = first_timestamp(&[record.processed_at.as_deref()]);
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
            ticket_id: record.ticket_id,
            customer_name,
            customer_email,
            amount: record.amount.unwrap_or(0.0),
            reason: record.reason.unwrap_or_default(),
            status: RowStatus::parse_or(record.status.as_deref(), RowStatus::Pending),
            requested_at,
            processed_at,
        }
    }
}

impl ListRow for RefundRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Ticket", "Customer", "Amount", "Reason", "Status", "Requested"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.ticket_id.clone().unwrap_or_default(),
            self.customer_name.clone(),
            format!("{:.2}", self.amount),
            self.reason.clone(),
            self.status.to_string(),
            format_day(self.requested_at),
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
            "reason" => Some(Cow::Borrowed(&self.reason)),
            "ticket" => Some(Cow::Borrowed(self.ticket_id.as_deref().unwrap_or_default())),
            _ => None,
        }
    }

    fn occurred_at(&self) -> Option<NaiveDateTime> {
        self.requested_at
    }

    fn display_name(&self) -> &str {
        &self.customer_name
    }

    fn amount(&self) -> f64 {
        self.amount
    }

    fn is_settled(&self) -> bool {
        matches!(self.status, RowStatus::Processed | RowStatus::Approved)
    }

    fn customer_key(&self) -> Option<String> {
        self.customer_email
            .as_ref()
            .map(|e| e.to_lowercase())
            .or_else(|| {
                (self.customer_name != UNKNOWN_CUSTOMER).then(|| self.customer_name.to_lowercase())
            })
    }
}

/// Refund requests awaiting or past an admin decision.
pub struct Refunds;

impl ListResource for Refunds {
    type Record = RefundRecord;
    type Row = RefundRow;

    const NAME: &'static str = "refunds";
    const PATH: &'static str = "/api/admin/refunds";
    const COLLECTION: &'static str = "refunds";
    const ACTIONS: &'static [RowAction] = &[
        RowAction::View,
        RowAction::ApproveRefund,
        RowAction::DenyRefund,
        RowAction::Export,
    ];

    fn normalize(record: RefundRecord) -> RefundRow {
        RefundRow::from(record)
    }
}
