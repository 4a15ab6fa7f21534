use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{DashboardError, Result};
use crate::models::SupervisorSummary;

/// UTF-8 byte-order mark so spreadsheet tools detect the encoding.
pub const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Employee code, name, region, branch, stars.
pub const HEADERS: [&str; 5] = ["行編", "姓名", "區域", "分行", "星數"];

pub fn write_report<W: Write>(mut out: W, rows: &[&SupervisorSummary]) -> Result<()> {
    out.write_all(BOM)?;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADERS).map_err(io::Error::from)?;
    for row in rows {
        let stars = row.total_stars.to_string();
        writer
            .write_record([
                row.id.as_str(),
                row.name.as_str(),
                row.region.as_str(),
                row.branch_name.as_str(),
                stars.as_str(),
            ])
            .map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

/// Report names are bare file names; anything that would leave `dir` is refused.
fn report_file_name(name: &str) -> Result<String> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => {
            Ok(format!("{name}.csv"))
        }
        _ => Err(DashboardError::Validation(format!(
            "report name `{name}` must be a plain file name"
        ))),
    }
}

/// Writes `<dir>/<name>.csv` and returns its path.
pub fn export_report(dir: &Path, name: &str, rows: &[&SupervisorSummary]) -> Result<PathBuf> {
    let path = dir.join(report_file_name(name)?);
    let file = std::fs::File::create(&path)?;
    write_report(io::BufWriter::new(file), rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "report exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn summary(id: &str, name: &str, stars: i64) -> SupervisorSummary {
        SupervisorSummary {
            id: id.to_string(),
            name: name.to_string(),
            branch_code: "03".to_string(),
            branch_name: "儲蓄部".to_string(),
            region: "北一區".to_string(),
            total_stars: stars,
            rank: 1,
            last_update: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn report_has_bom_fixed_header_and_one_row_per_entity() {
        let a = summary("A1", "甲", 5);
        let b = summary("A2", "王, 小明", 10);
        let mut out = Vec::new();
        write_report(&mut out, &[&a, &b]).unwrap();

        assert!(out.starts_with(BOM));
        let text = std::str::from_utf8(&out[BOM.len()..]).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(text.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].iter().collect::<Vec<_>>(), HEADERS.to_vec());
        assert_eq!(
            rows[2].iter().collect::<Vec<_>>(),
            vec!["A2", "王, 小明", "北一區", "儲蓄部", "10"]
        );
    }

    #[test]
    fn empty_view_exports_header_only() {
        let mut out = Vec::new();
        write_report(&mut out, &[]).unwrap();
        let text = std::str::from_utf8(&out[BOM.len()..]).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn export_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = summary("A1", "甲", 5);
        let path = export_report(dir.path(), "達人管理", &[&a]).unwrap();
        assert_eq!(path.file_name().unwrap(), "達人管理.csv");
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM));
    }

    #[test]
    fn report_name_cannot_leave_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let a = summary("A1", "甲", 5);
        for name in ["../escape", "/tmp/escape", "sub/escape", "..", "", "a\\b"] {
            assert!(
                matches!(
                    export_report(dir.path(), name, &[&a]),
                    Err(DashboardError::Validation(_))
                ),
                "accepted `{name}`"
            );
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
