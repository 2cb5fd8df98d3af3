use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by tickets, registrations and refunds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Completed,
    Pending,
    Paid,
    Approved,
    Processed,
    Denied,
    Refunded,
    Cancelled,
    /// Anything the client does not recognise, kept verbatim.
    Other(String),
}

impl RowStatus {
    /// Parses a backend status; blank or missing input yields `default`.
    pub fn parse_or(raw: Option<&str>, default: RowStatus) -> RowStatus {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return default;
        };
        match raw.to_lowercase().as_str() {
            "completed" | "complete" | "succeeded" | "success" => RowStatus::Completed,
            "pending" | "awaiting_payment" | "requested" => RowStatus::Pending,
            "paid" => RowStatus::Paid,
            "approved" => RowStatus::Approved,
            "processed" => RowStatus::Processed,
            "denied" | "rejected" => RowStatus::Denied,
            "refunded" => RowStatus::Refunded,
            "cancelled" | "canceled" => RowStatus::Cancelled,
            _ => RowStatus::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RowStatus::Completed => "completed",
            RowStatus::Pending => "pending",
            RowStatus::Paid => "paid",
            RowStatus::Approved => "approved",
            RowStatus::Processed => "processed",
            RowStatus::Denied => "denied",
            RowStatus::Refunded => "refunded",
            RowStatus::Cancelled => "cancelled",
            RowStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(None, RowStatus::Completed ; "missing uses default")]
    #[test_case(Some("  "), RowStatus::Completed ; "blank uses default")]
    #[test_case(Some("PENDING"), RowStatus::Pending ; "case insensitive")]
    #[test_case(Some("canceled"), RowStatus::Cancelled ; "american spelling")]
    #[test_case(Some("on_hold"), RowStatus::Other("on_hold".into()) ; "unknown kept verbatim")]
    fn test_parse_or(raw: Option<&str>, expected: RowStatus) {
        assert_eq!(RowStatus::parse_or(raw, RowStatus::Completed), expected);
    }
}
