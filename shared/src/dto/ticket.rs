use crate::dto::lenient::{self, FieldVariants};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Ticket purchase as returned by the backend, including the field-name
/// variants older endpoints still emit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub year: Option<i32>,
    #[serde(default)]
    pub purchased_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl FieldVariants for TicketRecord {
    const VARIANTS: &'static [(&'static str, &'static [&'static str])] = &[
        ("id", &["_id"]),
        ("customerName", &["customer_name", "customer", "buyerName"]),
        ("customerEmail", &["customer_email", "email"]),
        ("customerId", &["customer_id", "userId"]),
        ("package", &["packageName", "package_name", "ticketType"]),
        ("title", &["eventTitle", "event_title", "eventName"]),
        ("amount", &["total", "price"]),
        ("purchasedAt", &["purchased_at"]),
        ("processedAt", &["processed_at"]),
        ("createdAt", &["created_at"]),
    ];
}

/// Admin edit of a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdateForm {
    #[validate(length(min = 1, max = 100, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: String,
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[validate(range(min = 1, max = 50, message = "Quantity must be between 1 and 50"))]
    pub quantity: u32,
}
