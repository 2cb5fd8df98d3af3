use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a single filter field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FilterValue {
    /// Free text, matched as a case-insensitive substring.
    Text(String),
    /// Enumerated select, matched case-insensitively as a whole value.
    Choice(String),
}

impl FilterValue {
    pub fn as_str(&self) -> &str {
        match self {
            FilterValue::Text(s) | FilterValue::Choice(s) => s,
        }
    }

    /// Blank values never reach a query.
    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    /// Whether a row value satisfies this filter.
    pub fn matches(&self, candidate: &str) -> bool {
        let wanted = self.as_str().trim().to_lowercase();
        let candidate = candidate.trim().to_lowercase();
        match self {
            FilterValue::Text(_) => candidate.contains(&wanted),
            FilterValue::Choice(_) => candidate == wanted,
        }
    }
}

/// Inclusive calendar date range; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Combines a newer partial update into an older one.
pub trait Merge {
    fn merge(&mut self, newer: Self);
}

/// Current filter values of one list view.
///
/// Fields are kept in a `BTreeMap` so iteration order, and with it the
/// generated query, only depends on the contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    fields: BTreeMap<String, FilterValue>,
    #[serde(default)]
    date_range: DateRange,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, field: &str, value: &str) -> Self {
        self.set(field, Some(FilterValue::Text(value.to_string())));
        self
    }

    pub fn with_choice(mut self, field: &str, value: &str) -> Self {
        self.set(field, Some(FilterValue::Choice(value.to_string())));
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    pub fn set(&mut self, field: &str, value: Option<FilterValue>) {
        match value {
            Some(value) => {
                self.fields.insert(field.to_string(), value);
            }
            None => {
                self.fields.remove(field);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.fields.get(field)
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.date_range = range;
    }

    /// Non-blank fields in key order.
    pub fn active_fields(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(field, value)| (field.as_str(), value))
    }

    /// True when nothing would constrain a query.
    pub fn is_empty(&self) -> bool {
        self.active_fields().next().is_none() && self.date_range.is_empty()
    }

    pub fn apply(&mut self, patch: FilterPatch) {
        for (field, value) in patch.fields {
            self.set(&field, value);
        }
        if let Some(range) = patch.date_range {
            self.date_range = range;
        }
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.date_range = DateRange::default();
    }
}

/// Partial filter edit. `None` for a field clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    fields: BTreeMap<String, Option<FilterValue>>,
    date_range: Option<DateRange>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.fields
            .insert(field.to_string(), Some(FilterValue::Text(value.to_string())));
        self
    }

    pub fn choice(mut self, field: &str, value: &str) -> Self {
        self.fields
            .insert(field.to_string(), Some(FilterValue::Choice(value.to_string())));
        self
    }

    pub fn clear(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), None);
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Option<FilterValue>> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.date_range.is_none()
    }
}

impl Merge for FilterPatch {
    fn merge(&mut self, newer: Self) {
        self.fields.extend(newer.fields);
        if newer.date_range.is_some() {
            self.date_range = newer.date_range;
        }
    }
}
