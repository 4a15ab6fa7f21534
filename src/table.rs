use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use clap::ValueEnum;

use crate::models::{StarRow, SupervisorSummary};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A cell value as seen by the sorter.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    Number(i64),
    Text(&'a str),
    Instant(DateTime<Utc>),
}

impl SortValue<'_> {
    /// Text compares case-insensitively. Values of different kinds are equal.
    pub fn compare(&self, other: &SortValue<'_>) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (SortValue::Instant(a), SortValue::Instant(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

pub trait TableRow {
    type Column: Copy + PartialEq;

    fn sort_value(&self, column: Self::Column) -> SortValue<'_>;
}

pub trait RowFilter<T> {
    fn matches(&self, row: &T) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl<T> RowFilter<T> for NoFilter {
    fn matches(&self, _row: &T) -> bool {
        true
    }
}

/// Single-column sort. Clicking a column cycles
/// unsorted → ascending → descending → unsorted; clicking another column
/// starts that column at ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<C>(Option<(C, SortDirection)>);

impl<C: Copy + PartialEq> Default for SortState<C> {
    fn default() -> Self {
        SortState(None)
    }
}

impl<C: Copy + PartialEq> SortState<C> {
    pub fn active(&self) -> Option<(C, SortDirection)> {
        self.0
    }

    pub fn click(&mut self, column: C) {
        self.0 = match self.0 {
            Some((current, SortDirection::Ascending)) if current == column => {
                Some((column, SortDirection::Descending))
            }
            Some((current, SortDirection::Descending)) if current == column => None,
            _ => Some((column, SortDirection::Ascending)),
        };
    }

    pub fn set(&mut self, column: C, direction: SortDirection) {
        self.0 = Some((column, direction));
    }
}

pub fn sort_rows<T: TableRow>(rows: &mut [&T], sort: &SortState<T::Column>) {
    let Some((column, direction)) = sort.active() else {
        return;
    };
    // slice::sort_by is stable, so equal keys keep their filtered order.
    rows.sort_by(|a, b| {
        let ordering = a.sort_value(column).compare(&b.sort_value(column));
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Items `[(page-1)*size, page*size)`, truncated at the end of `items`.
/// Pages are 1-indexed; out-of-range pages yield an empty slice.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(items.len());
    let end = page.saturating_mul(page_size).min(items.len());
    &items[start..end]
}

/// Filter, then sort, then page. A new filter returns to page 1.
#[derive(Debug, Clone)]
pub struct TableState<F, C> {
    filter: F,
    sort: SortState<C>,
    page: usize,
    page_size: usize,
}

impl<F, C: Copy + PartialEq> TableState<F, C> {
    pub fn new(filter: F, page_size: usize) -> Self {
        Self {
            filter,
            sort: SortState::default(),
            page: 1,
            page_size,
        }
    }

    pub fn sort(&self) -> &SortState<C> {
        &self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_filter(&mut self, filter: F) {
        self.filter = filter;
        self.page = 1;
    }

    pub fn update_filter(&mut self, update: impl FnOnce(&mut F)) {
        update(&mut self.filter);
        self.page = 1;
    }

    pub fn click_sort(&mut self, column: C) {
        self.sort.click(column);
    }

    pub fn set_sort(&mut self, column: C, direction: SortDirection) {
        self.sort.set(column, direction);
    }

    /// Not clamped against the row count; callers check `total_pages`.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn view<'a, T>(&self, rows: &'a [T]) -> TableView<'a, T>
    where
        T: TableRow<Column = C>,
        F: RowFilter<T>,
    {
        let mut visible: Vec<&T> = rows.iter().filter(|row| self.filter.matches(row)).collect();
        sort_rows(&mut visible, &self.sort);
        TableView {
            rows: visible,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Filtered and sorted rows plus the page to show.
#[derive(Debug)]
pub struct TableView<'a, T> {
    pub rows: Vec<&'a T>,
    pub page: usize,
    pub page_size: usize,
}

impl<'a, T> TableView<'a, T> {
    pub fn total_items(&self) -> usize {
        self.rows.len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.rows.len(), self.page_size)
    }

    pub fn page_rows(&self) -> &[&'a T] {
        paginate(&self.rows, self.page, self.page_size)
    }
}

fn contains(haystack: &str, needle: &Option<String>) -> bool {
    match needle.as_deref() {
        Some(needle) if !needle.is_empty() => haystack.contains(needle),
        _ => true,
    }
}

fn within<T: PartialOrd>(value: &T, min: &Option<T>, max: &Option<T>) -> bool {
    min.as_ref().map_or(true, |min| value >= min) && max.as_ref().map_or(true, |max| value <= max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SupervisorColumn {
    Rank,
    Id,
    Name,
    Region,
    Branch,
    BranchCode,
    Stars,
}

impl TableRow for SupervisorSummary {
    type Column = SupervisorColumn;

    fn sort_value(&self, column: SupervisorColumn) -> SortValue<'_> {
        match column {
            SupervisorColumn::Rank => SortValue::Number(self.rank as i64),
            SupervisorColumn::Id => SortValue::Text(&self.id),
            SupervisorColumn::Name => SortValue::Text(&self.name),
            SupervisorColumn::Region => SortValue::Text(&self.region),
            SupervisorColumn::Branch => SortValue::Text(&self.branch_name),
            SupervisorColumn::BranchCode => SortValue::Text(&self.branch_code),
            SupervisorColumn::Stars => SortValue::Number(self.total_stars),
        }
    }
}

/// Substring filters are case-sensitive; empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupervisorFilter {
    pub id: Option<String>,
    pub name: Option<String>,
    pub region: Option<String>,
    pub branch: Option<String>,
    pub min_stars: Option<i64>,
    pub max_stars: Option<i64>,
}

impl RowFilter<SupervisorSummary> for SupervisorFilter {
    fn matches(&self, row: &SupervisorSummary) -> bool {
        contains(&row.id, &self.id)
            && contains(&row.name, &self.name)
            && contains(&row.region, &self.region)
            && contains(&row.branch_name, &self.branch)
            && within(&row.total_stars, &self.min_stars, &self.max_stars)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StarColumn {
    SupervisorId,
    Score,
    Type,
    Date,
}

impl TableRow for StarRow {
    type Column = StarColumn;

    fn sort_value(&self, column: StarColumn) -> SortValue<'_> {
        match column {
            StarColumn::SupervisorId => SortValue::Text(&self.record.supervisor_id),
            StarColumn::Score => SortValue::Number(self.record.score),
            StarColumn::Type => SortValue::Text(&self.type_name),
            StarColumn::Date => SortValue::Instant(self.record.date),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarFilter {
    /// Trimmed before matching.
    pub supervisor_id: Option<String>,
    /// Exact rating type code.
    pub kind: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RowFilter<StarRow> for StarFilter {
    fn matches(&self, row: &StarRow) -> bool {
        let supervisor = self.supervisor_id.as_deref().map(str::trim);
        let supervisor_ok = match supervisor {
            Some(needle) if !needle.is_empty() => row.record.supervisor_id.contains(needle),
            _ => true,
        };
        let kind_ok = match self.kind.as_deref() {
            Some(kind) if !kind.is_empty() => row.record.kind == kind,
            _ => true,
        };
        supervisor_ok && kind_ok && within(&row.record.date, &self.start, &self.end)
    }
}
