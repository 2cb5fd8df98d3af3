use crate::dto::common::{ListEnvelope, PaginationDto, StatsDto};
use crate::error::Result;
use crate::filter::FilterState;
use crate::query::SortOrder;
use crate::resource::{filter_rows, sort_rows, ListResource, ListRow};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Where the page numbers come from and where they stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationState {
    /// Builds a state from a requested page and a known item count,
    /// clamping the page into range.
    pub fn new(current_page: u32, page_size: u32, total_items: u64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = Self::total_pages_for(total_items, page_size);
        Self {
            current_page: clamp_page(current_page, total_pages),
            page_size,
            total_items,
            total_pages,
        }
    }

    pub fn from_server(dto: &PaginationDto, requested_page_size: u32) -> Self {
        let page_size = if dto.page_size > 0 {
            dto.page_size
        } else {
            requested_page_size.max(1)
        };
        let total_pages = dto
            .total_pages
            .unwrap_or_else(|| Self::total_pages_for(dto.total, page_size));
        Self {
            current_page: clamp_page(dto.current, total_pages),
            page_size,
            total_items: dto.total,
            total_pages,
        }
    }

    pub fn total_pages_for(total_items: u64, page_size: u32) -> u32 {
        let page_size = u64::from(page_size.max(1));
        let pages = total_items.div_ceil(page_size);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    /// Index of the first item of the current page.
    pub fn offset(&self) -> usize {
        (self.current_page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }

    /// Accounts for one item removed without re-fetching.
    pub fn remove_one(&mut self) {
        self.total_items = self.total_items.saturating_sub(1);
        self.total_pages = Self::total_pages_for(self.total_items, self.page_size);
        self.current_page = clamp_page(self.current_page, self.total_pages);
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(1, 25, 0)
    }
}

fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatsScope {
    /// Reported by the backend over the whole filtered result.
    Server,
    /// Computed from the rows the client holds.
    PageLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_amount: f64,
    pub total_count: u64,
    pub unique_customers: u64,
    pub average_amount: f64,
    pub scope: StatsScope,
    /// Rows behind `total_amount`; only known for page-local stats.
    #[serde(skip)]
    pub settled_count: u64,
}

impl StatsSummary {
    pub fn from_server(dto: &StatsDto) -> Self {
        let average_amount = dto.average_amount.unwrap_or_else(|| {
            if dto.total_count > 0 {
                dto.total_amount / dto.total_count as f64
            } else {
                0.0
            }
        });
        Self {
            total_amount: dto.total_amount,
            total_count: dto.total_count,
            unique_customers: dto.unique_customers,
            average_amount,
            scope: StatsScope::Server,
            settled_count: 0,
        }
    }

    pub fn from_rows<R: ListRow>(rows: &[R]) -> Self {
        let (total_amount, settled) = rows
            .iter()
            .filter(|row| row.is_settled())
            .fold((0.0, 0u64), |(sum, count), row| (sum + row.amount(), count + 1));
        let unique_customers = rows
            .iter()
            .filter_map(|row| row.customer_key())
            .filter(|key| !key.is_empty())
            .collect::<HashSet<_>>()
            .len() as u64;

        Self {
            total_amount,
            total_count: rows.len() as u64,
            unique_customers,
            average_amount: if settled > 0 {
                total_amount / settled as f64
            } else {
                0.0
            },
            scope: StatsScope::PageLocal,
            settled_count: settled,
        }
    }

    pub fn is_page_local(&self) -> bool {
        self.scope == StatsScope::PageLocal
    }

    /// Totals after one row was removed locally. Both scopes cover rows the
    /// page does not hold, so the removed row is subtracted instead of
    /// recounting. The unique customer count is left alone since other rows
    /// may share the customer.
    fn without_row<R: ListRow>(&self, row: &R) -> Self {
        let mut next = *self;
        next.total_count = next.total_count.saturating_sub(1);
        if row.is_settled() {
            next.total_amount = (next.total_amount - row.amount()).max(0.0);
            if next.scope == StatsScope::PageLocal {
                next.settled_count = next.settled_count.saturating_sub(1);
                next.average_amount = if next.settled_count > 0 {
                    next.total_amount / next.settled_count as f64
                } else {
                    0.0
                };
            }
        }
        if next.total_count == 0 {
            next.total_amount = 0.0;
            next.average_amount = 0.0;
            next.unique_customers = 0;
        }
        next
    }
}

impl Default for StatsSummary {
    fn default() -> Self {
        Self {
            total_amount: 0.0,
            total_count: 0,
            unique_customers: 0,
            average_amount: 0.0,
            scope: StatsScope::PageLocal,
            settled_count: 0,
        }
    }
}

/// One reduced page of a list: the rows to show plus the numbers around them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<R> {
    pub rows: Vec<R>,
    pub pagination: PaginationState,
    pub stats: StatsSummary,
    pub metadata: Option<Value>,
}

impl<R> Default for ListPage<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            pagination: PaginationState::default(),
            stats: StatsSummary::default(),
            metadata: None,
        }
    }
}

impl<R: ListRow> ListPage<R> {
    pub fn find(&self, id: &str) -> Option<&R> {
        self.rows.iter().find(|row| row.id() == id)
    }

    /// Drops the row with `id` and updates the counts to match.
    pub fn remove_row(&mut self, id: &str) -> Option<R> {
        let index = self.rows.iter().position(|row| row.id() == id)?;
        let removed = self.rows.remove(index);
        self.pagination.remove_one();
        self.stats = self.stats.without_row(&removed);
        Some(removed)
    }
}

/// Turns a raw list response into the page the user asked for.
///
/// With a server `pagination` block the records already are that page. Without
/// one the records are the whole result: they are filtered and sorted here and
/// the requested page is sliced out. Stats fall back to the held rows (before
/// slicing) when the server sends none.
pub fn reduce<L: ListResource>(
    mut envelope: ListEnvelope,
    filters: &FilterState,
    sort: Option<SortOrder>,
    page: u32,
    page_size: u32,
) -> Result<ListPage<L::Row>> {
    let records = envelope.take_records::<L::Record>(L::COLLECTION)?;
    let rows: Vec<L::Row> = records.into_iter().map(L::normalize).collect();
    let server_stats = envelope.stats.as_ref().map(StatsSummary::from_server);

    let (rows, pagination, stats) = match envelope.pagination {
        Some(ref dto) => {
            let stats = server_stats.unwrap_or_else(|| StatsSummary::from_rows(&rows));
            (rows, PaginationState::from_server(dto, page_size), stats)
        }
        None => {
            let mut rows = filter_rows(rows, filters);
            if let Some(sort) = sort {
                sort_rows(&mut rows, sort);
            }
            let stats = server_stats.unwrap_or_else(|| StatsSummary::from_rows(&rows));
            let pagination = PaginationState::new(page, page_size, rows.len() as u64);
            let rows = rows
                .into_iter()
                .skip(pagination.offset())
                .take(pagination.page_size as usize)
                .collect();
            (rows, pagination, stats)
        }
    };

    debug!(
        "reduced {} response: {} rows on page {}/{} ({:?} stats)",
        L::NAME,
        rows.len(),
        pagination.current_page,
        pagination.total_pages,
        stats.scope
    );

    Ok(ListPage {
        rows,
        pagination,
        stats,
        metadata: envelope.metadata,
    })
}
