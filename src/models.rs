use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

const REFERENCE_OFFSET_SECS: i32 = 8 * 3600;

/// Fixed UTC+8 offset used for date-only values and calendar bucketing.
pub fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Midnight of `date` in the reference offset.
pub fn reference_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    naive_in_reference(naive)
}

fn naive_in_reference(naive: NaiveDateTime) -> DateTime<Utc> {
    match reference_offset().from_local_datetime(&naive).single() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Accepts RFC 3339, RFC 2822 (what Flask emits for datetimes), a naive
/// `YYYY-MM-DDTHH:MM:SS` or a bare `YYYY-MM-DD`. Naive values are read in
/// the reference offset.
pub fn parse_wire_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive_in_reference(naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(reference_midnight)
}

pub fn display_date(value: &DateTime<Utc>) -> String {
    value
        .with_timezone(&reference_offset())
        .format("%Y/%m/%d")
        .to_string()
}

pub mod wire_date {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::wire_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_wire_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("unrecognised date `{raw}`")))
    }
}

pub mod wire_date_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => super::wire_date::serialize(dt, s),
            None => s.serialize_none(),
        }
    }

    /// Empty or unreadable values decode as `None`.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(super::parse_wire_date))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub branch_code: String,
    #[serde(
        default,
        with = "wire_date_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub update_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarRecord {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(alias = "masterId")]
    pub supervisor_id: String,
    pub score: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(with = "wire_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub valid: Option<bool>,
}

impl StarRecord {
    /// Records are valid unless explicitly soft-deleted.
    pub fn is_valid(&self) -> bool {
        self.valid != Some(false)
    }
}

/// A star record as submitted for creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarForm {
    pub supervisor_id: String,
    pub score: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "wire_date")]
    pub date: DateTime<Utc>,
    pub remarks: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StarPatch {
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    #[serde(default, alias = "_id")]
    pub id: String,
    /// `MM/DD/YYYY`
    pub date: String,
    /// `HH:MM`
    pub start_time: String,
    pub end_time: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddClassForm {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySettings {
    #[serde(default)]
    pub survey_url: String,
    #[serde(default)]
    pub survey_start_day: String,
}

/// Per-supervisor view rebuilt on every load.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorSummary {
    pub id: String,
    pub name: String,
    pub branch_code: String,
    pub branch_name: String,
    pub region: String,
    pub total_stars: i64,
    pub rank: usize,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_stars: i64,
    pub total_supervisors: usize,
    pub average_stars: f64,
    pub median_stars: f64,
    pub current_period_stars: i64,
}

/// A valid star record as listed in the rating detail table.
#[derive(Debug, Clone, PartialEq)]
pub struct StarRow {
    pub record: StarRecord,
    pub type_name: String,
}

pub(crate) fn wire_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
