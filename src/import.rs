use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{DashboardError, Result};
use crate::models::{reference_midnight, StarForm};
use crate::reference;

const REQUIRED_COLUMNS: [&str; 3] = ["supervisorId", "score", "type"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow {
    date: Option<String>,
    supervisor_id: Option<String>,
    score: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    remarks: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn coerce(row: CsvRow, line: usize, now: DateTime<Utc>) -> Result<StarForm> {
    let supervisor_id = non_empty(row.supervisor_id)
        .ok_or_else(|| DashboardError::parse_at(line, "supervisorId is empty"))?;

    let raw_score = non_empty(row.score)
        .ok_or_else(|| DashboardError::parse_at(line, "score is empty"))?;
    let score: i64 = raw_score
        .parse()
        .map_err(|_| DashboardError::parse_at(line, format!("score `{raw_score}` is not an integer")))?;

    let kind = non_empty(row.kind)
        .ok_or_else(|| DashboardError::parse_at(line, "type is empty"))?;
    if reference::rating_type_name(&kind).is_none() {
        return Err(DashboardError::parse_at(
            line,
            format!("unknown rating type `{kind}`"),
        ));
    }

    let date = match non_empty(row.date) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(reference_midnight)
            .map_err(|_| DashboardError::parse_at(line, format!("date `{raw}` is not YYYY-MM-DD")))?,
        None => now,
    };

    Ok(StarForm {
        supervisor_id,
        score,
        kind,
        date,
        remarks: non_empty(row.remarks).unwrap_or_default(),
    })
}

/// Parses a header-row CSV of star records. Any bad row rejects the whole
/// batch; blank lines are skipped.
pub fn parse_star_csv<R: Read>(input: R, now: DateTime<Utc>) -> Result<Vec<StarForm>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DashboardError::parse(format!("missing column `{column}`")));
        }
    }
    let headers = csv::StringRecord::from(headers);

    let mut batch = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| DashboardError::parse_at(line, e.to_string()))?;
        batch.push(coerce(row, line, now)?);
    }

    if batch.is_empty() {
        return Err(DashboardError::parse("file contains no data rows"));
    }
    tracing::info!(records = batch.len(), "parsed star CSV");
    Ok(batch)
}

pub fn read_star_csv(path: &Path, now: DateTime<Utc>) -> Result<Vec<StarForm>> {
    let file = std::fs::File::open(path)?;
    parse_star_csv(file, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 15, 4, 0, 0).unwrap()
    }

    #[test]
    fn parses_rows_and_applies_defaults() {
        let csv = "date,supervisorId,score,type,remarks\n\
                   2025-04-01,A1,5,1,準時出席\n\
                   \n\
                   ,A2,-2,3,\n";
        let batch = parse_star_csv(csv.as_bytes(), now()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].supervisor_id, "A1");
        assert_eq!(batch[0].score, 5);
        assert_eq!(batch[0].remarks, "準時出席");
        assert_eq!(
            batch[0].date,
            Utc.with_ymd_and_hms(2025, 3, 31, 16, 0, 0).unwrap()
        );
        assert_eq!(batch[1].score, -2);
        assert_eq!(batch[1].date, now());
        assert_eq!(batch[1].remarks, "");
    }

    #[test]
    fn column_order_follows_header() {
        let csv = "supervisorId,type,score\nA1,2,4\n";
        let batch = parse_star_csv(csv.as_bytes(), now()).unwrap();
        assert_eq!(batch[0].kind, "2");
        assert_eq!(batch[0].score, 4);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let csv = "\u{feff}date,supervisorId,score,type,remarks\n2025-04-01,A1,1,1,\n";
        let batch = parse_star_csv(csv.as_bytes(), now()).unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn non_numeric_score_rejects_batch() {
        let csv = "date,supervisorId,score,type,remarks\n\
                   2025-04-01,A1,5,1,\n\
                   2025-04-01,A2,five,1,\n";
        let err = parse_star_csv(csv.as_bytes(), now()).unwrap_err();
        match err {
            DashboardError::Parse { row, message } => {
                assert_eq!(row, Some(3));
                assert!(message.contains("five"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bad_date_and_unknown_type_are_parse_errors() {
        let csv = "date,supervisorId,score,type\n04/01/2025,A1,5,1\n";
        assert!(matches!(
            parse_star_csv(csv.as_bytes(), now()),
            Err(DashboardError::Parse { .. })
        ));
        let csv = "date,supervisorId,score,type\n2025-04-01,A1,5,42\n";
        assert!(matches!(
            parse_star_csv(csv.as_bytes(), now()),
            Err(DashboardError::Parse { .. })
        ));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let csv = "date,supervisorId,type\n2025-04-01,A1,1\n";
        let err = parse_star_csv(csv.as_bytes(), now()).unwrap_err();
        assert!(err.to_string().contains("score"));
    }

    #[test]
    fn header_only_file_is_rejected() {
        let csv = "date,supervisorId,score,type,remarks\n";
        assert!(parse_star_csv(csv.as_bytes(), now()).is_err());
    }
}
