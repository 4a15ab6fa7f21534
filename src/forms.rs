use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Url;

use crate::error::{DashboardError, Result};
use crate::models::{reference_midnight, AddClassForm, StarForm, Supervisor, SurveySettings};
use crate::reference;

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DashboardError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub fn supervisor(id: &str, name: &str, branch_code: &str) -> Result<Supervisor> {
    Ok(Supervisor {
        id: required("id", id)?,
        name: required("name", name)?,
        branch_code: branch_code.trim().to_string(),
        update_date: None,
    })
}

/// One score and type applied to every selected supervisor. `date` is a
/// calendar day anchored at reference midnight; without it the batch is
/// stamped with `now`.
pub fn rating_batch(
    supervisor_ids: &[String],
    score: i64,
    kind: &str,
    date: Option<NaiveDate>,
    remarks: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Result<Vec<StarForm>> {
    if supervisor_ids.is_empty() {
        return Err(DashboardError::Validation(
            "select at least one supervisor".into(),
        ));
    }
    if reference::rating_type_name(kind).is_none() {
        return Err(DashboardError::Validation(format!(
            "unknown rating type `{kind}`"
        )));
    }
    let date = date.map(reference_midnight).unwrap_or(now);

    supervisor_ids
        .iter()
        .map(|id| {
            Ok(StarForm {
                supervisor_id: required("supervisor id", id)?,
                score,
                kind: kind.to_string(),
                date,
                remarks: remarks.get(id).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| DashboardError::Validation(format!("{field} must be HH:MM, got `{value}`")))
}

pub fn class(
    date: &str,
    start_time: &str,
    end_time: &str,
    name: &str,
    kind: &str,
    marks: Option<&str>,
) -> Result<AddClassForm> {
    let day = NaiveDate::parse_from_str(date.trim(), "%m/%d/%Y").map_err(|_| {
        DashboardError::Validation(format!("date must be MM/DD/YYYY, got `{date}`"))
    })?;
    let start = parse_time("start time", start_time)?;
    let end = parse_time("end time", end_time)?;
    if end <= start {
        return Err(DashboardError::Validation(
            "end time must be after start time".into(),
        ));
    }
    if reference::class_type_name(kind).is_none() {
        return Err(DashboardError::Validation(format!(
            "unknown class type `{kind}`"
        )));
    }

    Ok(AddClassForm {
        date: day.format("%m/%d/%Y").to_string(),
        start_time: start.format("%H:%M").to_string(),
        end_time: end.format("%H:%M").to_string(),
        name: required("name", name)?,
        kind: kind.to_string(),
        marks: marks
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
    })
}

pub fn survey_settings(survey_url: &str, survey_start_day: &str) -> Result<SurveySettings> {
    let survey_url = survey_url.trim();
    if !survey_url.is_empty() {
        let parsed = Url::parse(survey_url)
            .map_err(|e| DashboardError::Validation(format!("survey URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DashboardError::Validation(
                "survey URL must be http or https".into(),
            ));
        }
    }
    Ok(SurveySettings {
        survey_url: survey_url.to_string(),
        survey_start_day: survey_start_day.trim().to_string(),
    })
}
