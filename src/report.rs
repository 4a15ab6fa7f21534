use std::fmt::Write;

use crate::aggregate::{Dashboard, Period};
use crate::models::{display_date, ClassSession, StarRow, SupervisorSummary, SurveySettings};
use crate::reference;
use crate::table::TableView;

fn footer<T>(output: &mut String, view: &TableView<'_, T>) {
    let _ = writeln!(
        output,
        "Page {} of {} ({} rows)",
        view.page,
        view.total_pages().max(1),
        view.total_items()
    );
}

fn period_label(period: Period) -> &'static str {
    match period {
        Period::All => "all time",
        Period::Month => "this month",
        Period::Quarter => "this quarter",
        Period::Year => "this year",
    }
}

pub fn render_dashboard(
    dashboard: &Dashboard,
    period: Period,
    view: &TableView<'_, SupervisorSummary>,
) -> String {
    let stats = &dashboard.stats;
    let mut output = String::new();

    let _ = writeln!(output, "# Dashboard");
    let _ = writeln!(output, "Supervisors:        {}", stats.total_supervisors);
    let _ = writeln!(output, "Total stars:        {}", stats.total_stars);
    let _ = writeln!(output, "Stars this month:   {}", stats.current_period_stars);
    let _ = writeln!(output, "Median stars:       {}", stats.median_stars);
    let _ = writeln!(output, "Average stars:      {:.2}", stats.average_stars);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Ranking ({})", period_label(period));

    if view.total_items() == 0 {
        let _ = writeln!(output, "No supervisors recorded.");
        return output;
    }

    for row in view.page_rows() {
        let _ = writeln!(
            output,
            "{:>4}  {:<10} {:<8} {:<6} {:<8} {:>6}  {}",
            row.rank,
            row.id,
            row.name,
            row.region,
            row.branch_code,
            row.total_stars,
            display_date(&row.last_update)
        );
    }
    footer(&mut output, view);
    output
}

pub fn render_supervisors(view: &TableView<'_, SupervisorSummary>) -> String {
    let mut output = String::new();
    if view.total_items() == 0 {
        let _ = writeln!(output, "No supervisors match these filters.");
        return output;
    }
    for row in view.page_rows() {
        let _ = writeln!(
            output,
            "{:<10} {:<8} {:<6} {:<8} {:<4} {:>6}",
            row.id, row.name, row.region, row.branch_name, row.branch_code, row.total_stars
        );
    }
    footer(&mut output, view);
    output
}

pub fn render_stars(view: &TableView<'_, StarRow>) -> String {
    let mut output = String::new();
    if view.total_items() == 0 {
        let _ = writeln!(output, "No rating records match these filters.");
        return output;
    }
    for row in view.page_rows() {
        let record = &row.record;
        let _ = writeln!(
            output,
            "{:<26} {:<10} {:>4}  {:<12} {}  {}",
            record.id,
            record.supervisor_id,
            record.score,
            row.type_name,
            display_date(&record.date),
            record.remarks
        );
    }
    footer(&mut output, view);
    output
}

pub fn render_classes(classes: &[ClassSession]) -> String {
    let mut output = String::new();
    if classes.is_empty() {
        let _ = writeln!(output, "No classes scheduled.");
        return output;
    }
    for class in classes {
        let _ = writeln!(
            output,
            "{:<26} {} {}-{}  {}  ({})",
            class.id,
            class.date,
            class.start_time,
            class.end_time,
            class.name,
            reference::class_type_name(&class.kind).unwrap_or(class.kind.as_str())
        );
    }
    output
}

pub fn render_settings(settings: &SurveySettings) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Survey URL:       {}", settings.survey_url);
    let _ = writeln!(output, "Survey start day: {}", settings.survey_start_day);
    output
}

pub fn render_reference() -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Regions");
    for (code, name) in reference::region_areas() {
        let _ = writeln!(output, "{code}  {name}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Branches");
    for branch in reference::branches() {
        let _ = writeln!(
            output,
            "{}  {:<8} {}",
            branch.code,
            branch.name,
            reference::region_name(branch.area_code).unwrap_or(reference::UNKNOWN)
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rating types");
    for (code, name) in reference::rating_types() {
        let _ = writeln!(output, "{code}  {name}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::build_dashboard;
    use crate::models::Supervisor;
    use crate::table::{NoFilter, TableState};
    use chrono::{TimeZone, Utc};

    #[test]
    fn dashboard_lists_stats_and_current_page() {
        let now = Utc.with_ymd_and_hms(2025, 4, 15, 0, 0, 0).unwrap();
        let supervisors: Vec<Supervisor> = (1..=12)
            .map(|i| Supervisor {
                id: format!("A{i:02}"),
                name: format!("n{i}"),
                branch_code: "03".into(),
                update_date: None,
            })
            .collect();
        let dashboard = build_dashboard(&supervisors, &[], Period::All, &now);
        let mut table = TableState::new(NoFilter, 10);
        table.set_page(2);
        let view = table.view(&dashboard.ranking);

        let text = render_dashboard(&dashboard, Period::All, &view);
        assert!(text.contains("Supervisors:        12"));
        assert!(text.contains("A11"));
        assert!(!text.contains("A01"));
        assert!(text.contains("Page 2 of 2 (12 rows)"));
    }

    #[test]
    fn empty_listings_say_so() {
        let rows: Vec<StarRow> = Vec::new();
        let table = TableState::new(NoFilter, 10);
        assert!(render_stars(&table.view(&rows)).contains("No rating records"));
        assert!(render_classes(&[]).contains("No classes"));
    }

    #[test]
    fn reference_listing_is_ordered() {
        let text = render_reference();
        let first = text.find("02  國營二部").unwrap();
        let later = text.find("03  儲蓄部").unwrap();
        assert!(first < later);
    }
}
