use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use clap::ValueEnum;

use crate::models::{
    reference_offset, DashboardStats, StarRecord, StarRow, Supervisor, SupervisorSummary,
};
use crate::reference;

/// Calendar window applied to star records before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Period {
    #[default]
    All,
    Month,
    Quarter,
    Year,
}

impl Period {
    /// Calendar fields of both instants are read in the reference offset.
    pub fn contains(self, date: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
        let offset = reference_offset();
        let date = date.with_timezone(&offset);
        let now = now.with_timezone(&offset);
        match self {
            Period::All => true,
            Period::Year => date.year() == now.year(),
            Period::Quarter => date.year() == now.year() && date.month0() / 3 == now.month0() / 3,
            Period::Month => date.year() == now.year() && date.month() == now.month(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub ranking: Vec<SupervisorSummary>,
}

pub fn median(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn valid_stars(stars: &[StarRecord]) -> impl Iterator<Item = &StarRecord> {
    stars.iter().filter(|star| star.is_valid())
}

/// Valid records whose supervisor exists. Everything else counts for nothing.
pub fn counted_stars<'a>(
    supervisors: &[Supervisor],
    stars: &'a [StarRecord],
) -> impl Iterator<Item = &'a StarRecord> {
    let known: HashSet<String> = supervisors.iter().map(|s| s.id.clone()).collect();
    valid_stars(stars).filter(move |star| known.contains(star.supervisor_id.as_str()))
}

/// Per-supervisor sums of the counted records, plus their total. Sums
/// saturate instead of overflowing.
pub fn supervisor_totals<'a>(
    supervisors: &[Supervisor],
    stars: &'a [StarRecord],
) -> (HashMap<&'a str, i64>, i64) {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    let mut total = 0i64;

    for star in counted_stars(supervisors, stars) {
        let entry = totals.entry(star.supervisor_id.as_str()).or_insert(0);
        *entry = entry.saturating_add(star.score);
        total = total.saturating_add(star.score);
    }

    (totals, total)
}

pub fn compute_stats(
    supervisors: &[Supervisor],
    stars: &[StarRecord],
    now: &DateTime<Utc>,
) -> DashboardStats {
    let (totals, total_stars) = supervisor_totals(supervisors, stars);
    let total_supervisors = supervisors.len();

    let average_stars = if total_supervisors == 0 {
        0.0
    } else {
        round2(total_stars as f64 / total_supervisors as f64)
    };

    let per_supervisor: Vec<i64> = supervisors
        .iter()
        .map(|s| totals.get(s.id.as_str()).copied().unwrap_or(0))
        .collect();

    let current_period_stars = counted_stars(supervisors, stars)
        .filter(|star| Period::Month.contains(&star.date, now))
        .fold(0i64, |sum, star| sum.saturating_add(star.score));

    DashboardStats {
        total_stars,
        total_supervisors,
        average_stars,
        median_stars: median(&per_supervisor),
        current_period_stars,
    }
}

/// Joins supervisors with their totals and the reference tables, then ranks
/// them by total stars descending, ties broken by id ascending.
pub fn rank_supervisors(
    supervisors: &[Supervisor],
    stars: &[StarRecord],
    now: &DateTime<Utc>,
) -> Vec<SupervisorSummary> {
    let (totals, _) = supervisor_totals(supervisors, stars);

    let mut summaries: Vec<SupervisorSummary> = supervisors
        .iter()
        .map(|s| SupervisorSummary {
            id: s.id.clone(),
            name: s.name.clone(),
            branch_code: s.branch_code.clone(),
            branch_name: reference::branch_name(&s.branch_code).to_string(),
            region: reference::region_for_branch(&s.branch_code).to_string(),
            total_stars: totals.get(s.id.as_str()).copied().unwrap_or(0),
            rank: 0,
            last_update: s.update_date.unwrap_or(*now),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_stars
            .cmp(&a.total_stars)
            .then_with(|| a.id.cmp(&b.id))
    });
    for (index, summary) in summaries.iter_mut().enumerate() {
        summary.rank = index + 1;
    }

    summaries
}

/// Header statistics cover every valid record; the ranking only counts
/// records inside `period`.
pub fn build_dashboard(
    supervisors: &[Supervisor],
    stars: &[StarRecord],
    period: Period,
    now: &DateTime<Utc>,
) -> Dashboard {
    let stats = compute_stats(supervisors, stars, now);
    let windowed: Vec<StarRecord> = stars
        .iter()
        .filter(|star| period.contains(&star.date, now))
        .cloned()
        .collect();
    let ranking = rank_supervisors(supervisors, &windowed, now);

    tracing::debug!(
        supervisors = stats.total_supervisors,
        total_stars = stats.total_stars,
        ?period,
        "dashboard aggregated"
    );

    Dashboard { stats, ranking }
}

/// Valid records with their rating type resolved for display.
pub fn star_rows(stars: &[StarRecord]) -> Vec<StarRow> {
    valid_stars(stars)
        .map(|star| StarRow {
            type_name: reference::rating_type_name(&star.kind)
                .map(str::to_string)
                .unwrap_or_else(|| star.kind.clone()),
            record: star.clone(),
        })
        .collect()
}
