use crate::filter::FilterState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const START_DATE_KEY: &str = "startDate";
pub const END_DATE_KEY: &str = "endDate";
pub const SORT_KEY: &str = "sort";
pub const PAGE_KEY: &str = "page";
pub const LIMIT_KEY: &str = "limit";

/// Wire format of dates in list queries.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Sort token understood by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 6] = [
        SortOrder::DateDesc,
        SortOrder::DateAsc,
        SortOrder::AmountDesc,
        SortOrder::AmountAsc,
        SortOrder::NameAsc,
        SortOrder::NameDesc,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "dateDesc",
            SortOrder::DateAsc => "dateAsc",
            SortOrder::AmountDesc => "amountDesc",
            SortOrder::AmountAsc => "amountAsc",
            SortOrder::NameAsc => "nameAsc",
            SortOrder::NameDesc => "nameDesc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .iter()
            .copied()
            .find(|order| order.token().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown sort order: {}", s))
    }
}

/// Canonical, ordered query parameters of one list request.
///
/// Filter pairs come first, followed by `sort`, `page` and `limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pairs: Vec<(String, String)>,
    filter_len: usize,
}

impl ListQuery {
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Only the pairs produced by filter fields and the date range.
    pub fn filter_pairs(&self) -> &[(String, String)] {
        &self.pairs[..self.filter_len]
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Same query without `page` and `limit`, as used by export endpoints.
    pub fn without_pagination(&self) -> ListQuery {
        ListQuery {
            pairs: self
                .pairs
                .iter()
                .filter(|(k, _)| k != PAGE_KEY && k != LIMIT_KEY)
                .cloned()
                .collect(),
            filter_len: self.filter_len,
        }
    }

    /// Percent-encoded `k=v&k=v` form, empty when there are no pairs.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Appends the query string to a path or URL.
    pub fn apply_to(&self, path: &str) -> String {
        let qs = self.to_query_string();
        if qs.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, qs)
        }
    }

    fn push(&mut self, key: &str, value: String) {
        self.pairs.push((key.to_string(), value));
    }
}

/// Builds the query for a list request.
///
/// Blank fields are skipped, the date range only contributes the sides that
/// are set, and `sort` is added only when chosen. `page` is at least 1 and
/// `limit` at least 1.
pub fn build_query(
    filters: &FilterState,
    sort: Option<SortOrder>,
    page: u32,
    page_size: u32,
) -> ListQuery {
    let mut query = ListQuery::default();

    for (field, value) in filters.active_fields() {
        query.push(field, value.as_str().trim().to_string());
    }

    let range = filters.date_range();
    if let Some(start) = range.start {
        query.push(START_DATE_KEY, start.format(QUERY_DATE_FORMAT).to_string());
    }
    if let Some(end) = range.end {
        query.push(END_DATE_KEY, end.format(QUERY_DATE_FORMAT).to_string());
    }
    query.filter_len = query.pairs.len();

    if let Some(sort) = sort {
        query.push(SORT_KEY, sort.token().to_string());
    }
    query.push(PAGE_KEY, page.max(1).to_string());
    query.push(LIMIT_KEY, page_size.max(1).to_string());

    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DateRange, FilterValue};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn pairs(query: &ListQuery) -> Vec<(&str, &str)> {
        query
            .pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_full_query_order() {
        let filters = FilterState::new()
            .with_text("season", "Spring")
            .with_choice("status", "pending")
            .with_text("customer", "  Jordan ")
            .with_date_range(DateRange::new(
                NaiveDate::from_ymd_opt(2024, 3, 1),
                NaiveDate::from_ymd_opt(2024, 3, 31),
            ));

        let query = build_query(&filters, Some(SortOrder::DateDesc), 2, 25);

        assert_eq!(
            pairs(&query),
            vec![
                ("customer", "Jordan"),
                ("season", "Spring"),
                ("status", "pending"),
                ("startDate", "2024-03-01"),
                ("endDate", "2024-03-31"),
                ("sort", "dateDesc"),
                ("page", "2"),
                ("limit", "25"),
            ]
        );
    }

    #[test]
    fn test_open_ended_range_only_emits_set_side() {
        let filters = FilterState::new()
            .with_date_range(DateRange::new(None, NaiveDate::from_ymd_opt(2024, 12, 1)));
        let query = build_query(&filters, None, 1, 10);

        assert_eq!(query.get(START_DATE_KEY), None);
        assert_eq!(query.get(END_DATE_KEY), Some("2024-12-01"));
        assert_eq!(query.get(SORT_KEY), None);
    }

    #[test]
    fn test_page_and_limit_are_clamped() {
        let query = build_query(&FilterState::new(), None, 0, 0);
        assert_eq!(query.get(PAGE_KEY), Some("1"));
        assert_eq!(query.get(LIMIT_KEY), Some("1"));
    }

    #[test]
    fn test_query_string_is_percent_encoded() {
        let filters = FilterState::new().with_text("package", "Family & Friends");
        let query = build_query(&filters, None, 1, 20);
        assert_eq!(
            query.to_query_string(),
            "package=Family%20%26%20Friends&page=1&limit=20"
        );
        assert_eq!(
            query.without_pagination().apply_to("/api/admin/tickets/export"),
            "/api/admin/tickets/export?package=Family%20%26%20Friends"
        );
    }

    #[test]
    fn test_sort_order_round_trips_through_token() {
        for order in SortOrder::ALL {
            assert_eq!(order.token().parse::<SortOrder>(), Ok(order));
        }
        assert!("newest".parse::<SortOrder>().is_err());
    }

    fn filter_value() -> impl Strategy<Value = Option<FilterValue>> {
        prop_oneof![
            Just(None),
            "[ ]{0,3}".prop_map(|s| Some(FilterValue::Text(s))),
            "[ a-z]{0,8}".prop_map(|s| Some(FilterValue::Text(s))),
            "[a-z]{0,6}".prop_map(|s| Some(FilterValue::Choice(s))),
        ]
    }

    fn filter_state() -> impl Strategy<Value = FilterState> {
        (
            prop::collection::vec(("[a-z]{1,8}", filter_value()), 0..6),
            prop::option::of(0u32..3650),
            prop::option::of(0u32..3650),
        )
            .prop_map(|(fields, start, end)| {
                let base = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
                let mut state = FilterState::new();
                for (field, value) in fields {
                    state.set(&field, value);
                }
                state.set_date_range(DateRange::new(
                    start.map(|d| base + chrono::Duration::days(d as i64)),
                    end.map(|d| base + chrono::Duration::days(d as i64)),
                ));
                state
            })
    }

    proptest! {
        #[test]
        fn prop_blank_filters_produce_no_filter_pairs(
            fields in prop::collection::vec(("[a-z]{1,8}", "[ ]{0,4}"), 0..6),
            page in 1u32..50,
            page_size in 1u32..200,
        ) {
            let mut state = FilterState::new();
            for (field, blank) in fields {
                state.set(&field, Some(FilterValue::Text(blank)));
            }
            let query = build_query(&state, None, page, page_size);
            prop_assert!(query.filter_pairs().is_empty());
            prop_assert_eq!(query.pairs().len(), 2);
        }

        #[test]
        fn prop_query_building_is_deterministic(
            state in filter_state(),
            sort in prop::option::of(prop::sample::select(SortOrder::ALL.to_vec())),
            page in 1u32..50,
            page_size in 1u32..200,
        ) {
            let first = build_query(&state, sort, page, page_size);
            let second = build_query(&state.clone(), sort, page, page_size);
            prop_assert_eq!(first.pairs(), second.pairs());
            prop_assert_eq!(first.to_query_string(), second.to_query_string());
        }

        #[test]
        fn prop_no_blank_value_is_ever_emitted(state in filter_state()) {
            let query = build_query(&state, None, 1, 25);
            for (_, value) in query.filter_pairs() {
                prop_assert!(!value.trim().is_empty());
            }
        }
    }
}
