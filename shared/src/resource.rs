use crate::dto::lenient::FieldVariants;
use crate::filter::FilterState;
use crate::models::auth::Role;
use crate::query::SortOrder;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Debug;

/// Per-row affordances offered by the list renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    View,
    Edit,
    Delete,
    Export,
    ApproveRefund,
    DenyRefund,
}

impl RowAction {
    pub fn label(&self) -> &'static str {
        match self {
            RowAction::View => "view",
            RowAction::Edit => "edit",
            RowAction::Delete => "delete",
            RowAction::Export => "export",
            RowAction::ApproveRefund => "approve",
            RowAction::DenyRefund => "deny",
        }
    }

    /// Destructive or money-moving actions wait for an explicit confirmation.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            RowAction::Delete | RowAction::ApproveRefund | RowAction::DenyRefund
        )
    }

    pub fn allowed_for(&self, role: Role) -> bool {
        match role {
            Role::Admin => true,
            Role::Staff => matches!(
                self,
                RowAction::View
                    | RowAction::Export
                    | RowAction::ApproveRefund
                    | RowAction::DenyRefund
            ),
            Role::Viewer => matches!(self, RowAction::View),
        }
    }
}

/// A normalized, display-ready record.
pub trait ListRow: Clone + Debug + Serialize + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Table headers, matching the order of [`ListRow::cells`].
    fn columns() -> &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    /// Value of a filterable field; `None` when the row has no such field,
    /// in which case the filter does not constrain it.
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Date used by date-range filters and date sorting.
    fn occurred_at(&self) -> Option<NaiveDateTime> {
        None
    }

    /// Name used by name sorting.
    fn display_name(&self) -> &str;

    fn amount(&self) -> f64 {
        0.0
    }

    /// Whether the row counts towards the amount totals.
    fn is_settled(&self) -> bool {
        false
    }

    /// Identity used for the unique-customer count.
    fn customer_key(&self) -> Option<String> {
        None
    }
}

/// One admin list: where it lives on the backend and how its records map
/// onto rows.
pub trait ListResource: Send + Sync + 'static {
    type Record: DeserializeOwned + FieldVariants + Send;
    type Row: ListRow;

    const NAME: &'static str;
    const PATH: &'static str;
    const COLLECTION: &'static str;
    const ACTIONS: &'static [RowAction];

    fn normalize(record: Self::Record) -> Self::Row;

    fn item_path(id: &str) -> String {
        format!("{}/{}", Self::PATH, urlencoding::encode(id))
    }

    fn export_path() -> String {
        format!("{}/export", Self::PATH)
    }

    /// Actions visible to `role` on every row of this list.
    fn actions_for(role: Role) -> Vec<RowAction> {
        Self::ACTIONS
            .iter()
            .copied()
            .filter(|action| action.allowed_for(role))
            .collect()
    }
}

/// Client-side equivalent of the server's filtering, used when the server
/// returns an unpaginated list.
pub fn row_matches<R: ListRow>(row: &R, filters: &FilterState) -> bool {
    let fields_match = filters
        .active_fields()
        .all(|(name, value)| match row.field(name) {
            Some(candidate) => value.matches(&candidate),
            None => true,
        });
    if !fields_match {
        return false;
    }

    let range = filters.date_range();
    if range.is_empty() {
        return true;
    }
    row.occurred_at()
        .map(|dt| range.contains(dt.date()))
        .unwrap_or(false)
}

pub fn filter_rows<R: ListRow>(rows: Vec<R>, filters: &FilterState) -> Vec<R> {
    rows.into_iter().filter(|row| row_matches(row, filters)).collect()
}

/// Stable local sort; rows without a date sort last for date orders.
pub fn sort_rows<R: ListRow>(rows: &mut [R], sort: SortOrder) {
    fn by_date(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match sort {
        SortOrder::DateAsc => rows.sort_by(|a, b| by_date(a.occurred_at(), b.occurred_at())),
        SortOrder::DateDesc => rows.sort_by(|a, b| match (a.occurred_at(), b.occurred_at()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (x, y) => by_date(x, y),
        }),
        SortOrder::AmountAsc => rows.sort_by(|a, b| a.amount().total_cmp(&b.amount())),
        SortOrder::AmountDesc => rows.sort_by(|a, b| b.amount().total_cmp(&a.amount())),
        SortOrder::NameAsc => rows.sort_by_key(|row| row.display_name().to_lowercase()),
        SortOrder::NameDesc => {
            rows.sort_by(|a, b| b.display_name().to_lowercase().cmp(&a.display_name().to_lowercase()))
        }
    }
}

/// Day of a timestamp, for display.
pub fn format_day(dt: Option<NaiveDateTime>) -> String {
    dt.map(|dt| dt.date().format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
