use crate::dto::lenient::{self, FieldVariants};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Refund request as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub requested_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl FieldVariants for RefundRecord {
    const VARIANTS: &'static [(&'static str, &'static [&'static str])] = &[
        ("id", &["_id"]),
        ("ticketId", &["ticket_id", "ticket"]),
        ("customerName", &["customer_name", "customer"]),
        ("customerEmail", &["customer_email", "email"]),
        ("amount", &["refundAmount", "refund_amount"]),
        ("requestedAt", &["requested_at"]),
        ("processedAt", &["processed_at"]),
        ("createdAt", &["created_at"]),
    ];
}

/// Outcome an admin picks for a pending refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundDecision {
    Approve,
    Deny,
}

impl RefundDecision {
    /// Last path segment of the decision endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            RefundDecision::Approve => "approve",
            RefundDecision::Deny => "deny",
        }
    }
}

/// Body sent with a refund decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundDecisionForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
    #[serde(default)]
    pub notify_customer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_decision_note_length() {
        let form = RefundDecisionForm {
            note: Some("x".repeat(501)),
            notify_customer: true,
        };
        assert!(form.validate().is_err());
        assert!(RefundDecisionForm::default().validate().is_ok());
    }
}
