use crate::banner::Banner;
use crate::controller::{ListView, Phase};
use shared::reducer::{PaginationState, StatsSummary};
use shared::resource::{ListRow, RowAction};
use std::fmt;

/// `1234.5` as `$1,234.50`.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}${}.{:02}", if negative { "-" } else { "" }, grouped, cents % 100)
}

pub fn pagination_line(pagination: &PaginationState) -> String {
    let pages = pagination.total_pages.max(1);
    let mut line = format!(
        "Page {} of {} · {} items",
        pagination.current_page, pages, pagination.total_items
    );
    if pagination.has_prev() {
        line.push_str(" · [prev]");
    }
    if pagination.has_next() {
        line.push_str(" · [next]");
    }
    line
}

pub fn stats_line(stats: &StatsSummary) -> String {
    let mut line = format!(
        "Total {} · {} records · {} customers · avg {}",
        format_amount(stats.total_amount),
        stats.total_count,
        stats.unique_customers,
        format_amount(stats.average_amount)
    );
    if stats.is_page_local() {
        line.push_str(" (loaded rows only)");
    }
    line
}

/// Plain-text rendering of one list view.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub title: String,
    pub banner: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub empty_message: Option<String>,
    pub footer: Vec<String>,
}

impl TableView {
    pub fn from_view<R: ListRow>(title: &str, view: &ListView<R>, actions: &[RowAction]) -> Self {
        let action_cell = actions
            .iter()
            .map(RowAction::label)
            .collect::<Vec<_>>()
            .join("/");

        let mut headers: Vec<String> = R::columns().iter().map(|c| c.to_string()).collect();
        if !action_cell.is_empty() {
            headers.push("Actions".to_string());
        }

        let rows = view
            .rows()
            .iter()
            .map(|row| {
                let mut cells = row.cells();
                if !action_cell.is_empty() {
                    cells.push(action_cell.clone());
                }
                cells
            })
            .collect::<Vec<_>>();

        let empty_message = match view.phase {
            Phase::Loading if rows.is_empty() => Some("Loading…".to_string()),
            Phase::Errored if rows.is_empty() => Some("Could not load this list.".to_string()),
            Phase::Closed => Some("Closed.".to_string()),
            _ if rows.is_empty() => Some(format!("No {} found.", title.to_lowercase())),
            _ => None,
        };

        Self {
            title: title.to_string(),
            banner: view.banner.as_ref().map(banner_line),
            headers,
            rows,
            empty_message,
            footer: vec![pagination_line(view.pagination()), stats_line(view.stats())],
        }
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

fn banner_line(banner: &Banner) -> String {
    format!("{} {}", banner.level.icon(), banner.message)
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "{}", line.trim_end())
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        if let Some(banner) = &self.banner {
            writeln!(f, "{}", banner)?;
        }

        let widths = self.widths();
        write_row(f, &self.headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(f, &rule, &widths)?;
        for row in &self.rows {
            write_row(f, row, &widths)?;
        }
        if let Some(message) = &self.empty_message {
            writeln!(f, "{}", message)?;
        }

        for line in &self.footer {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
