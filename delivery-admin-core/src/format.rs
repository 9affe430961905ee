//! Display formatting for dates coming from documents, storage or input.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::store::FieldValue;

/// Shown when there is no date at all.
pub const NOT_AVAILABLE: &str = "N/A";

/// Shown when a value cannot be read as a date.
pub const INVALID_DATE: &str = "Invalid Date";

const DISPLAY_FORMAT: &str = "%b %-d, %Y";

/// A timestamp as the document database hands it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl BackendTimestamp {
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }
}

/// Any of the date representations the panel receives.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    Empty,
    /// Text to parse: RFC 3339, `YYYY-MM-DD`, or a naive date-time.
    Text(String),
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    Native(DateTime<Utc>),
    Timestamp(BackendTimestamp),
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

impl From<i64> for DateInput {
    fn from(millis: i64) -> Self {
        DateInput::Millis(millis)
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(dt: DateTime<Utc>) -> Self {
        DateInput::Native(dt)
    }
}

impl From<BackendTimestamp> for DateInput {
    fn from(ts: BackendTimestamp) -> Self {
        DateInput::Timestamp(ts)
    }
}

impl<T: Into<DateInput>> From<Option<T>> for DateInput {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DateInput::Empty)
    }
}

impl From<&FieldValue> for DateInput {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => DateInput::Empty,
            FieldValue::Timestamp(ts) => DateInput::Native(*ts),
            FieldValue::Int(millis) => DateInput::Millis(*millis),
            FieldValue::Float(millis) if millis.is_finite() => DateInput::Millis(*millis as i64),
            FieldValue::String(s) => DateInput::Text(s.clone()),
            other => DateInput::Text(serde_json::to_string(other).unwrap_or_default()),
        }
    }
}

/// A date the formatter can print: either an instant or a plain calendar day.
enum Resolved {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

fn parse_text(text: &str) -> Option<Resolved> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Resolved::Instant(dt.with_timezone(&Utc)));
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Resolved::Day(day));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Resolved::Day(naive.date()))
}

/// Formats `input` as a short local date such as `Mar 15, 2024`.
///
/// Returns [`NOT_AVAILABLE`] for empty input and [`INVALID_DATE`] for anything
/// that is not a representable date.
pub fn format_date(input: impl Into<DateInput>) -> String {
    let resolved = match input.into() {
        DateInput::Empty => return NOT_AVAILABLE.to_string(),
        DateInput::Text(text) if text.trim().is_empty() => return NOT_AVAILABLE.to_string(),
        DateInput::Text(text) => parse_text(text.trim()),
        DateInput::Millis(millis) => Utc
            .timestamp_millis_opt(millis)
            .single()
            .map(Resolved::Instant),
        DateInput::Native(dt) => Some(Resolved::Instant(dt)),
        DateInput::Timestamp(ts) => ts.to_datetime().map(Resolved::Instant),
    };

    match resolved {
        Some(Resolved::Instant(dt)) => dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string(),
        Some(Resolved::Day(day)) => day.format(DISPLAY_FORMAT).to_string(),
        None => INVALID_DATE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        let noon = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Local
            .from_local_datetime(&noon)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(format_date(DateInput::Empty), "N/A");
        assert_eq!(format_date(""), "N/A");
        assert_eq!(format_date("   "), "N/A");
        assert_eq!(format_date(None::<&str>), "N/A");
        assert_eq!(format_date(&FieldValue::Null), "N/A");
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(format_date("not-a-date"), "Invalid Date");
        assert_eq!(format_date("2024-13-40"), "Invalid Date");
        assert_eq!(format_date(i64::MAX), "Invalid Date");
        assert_eq!(
            format_date(BackendTimestamp {
                seconds: 0,
                nanos: 2_000_000_000
            }),
            "Invalid Date"
        );
        assert_eq!(format_date(&FieldValue::Bool(true)), "Invalid Date");
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(format_date("2024-03-15"), "Mar 15, 2024");
        assert_eq!(format_date("2024-03-05T08:30:00"), "Mar 5, 2024");
    }

    #[test]
    fn test_instants_use_local_day() {
        let noon = local_noon(2024, 3, 15);
        assert_eq!(format_date(noon), "Mar 15, 2024");
        assert_eq!(format_date(noon.timestamp_millis()), "Mar 15, 2024");
        assert_eq!(format_date(noon.to_rfc3339()), "Mar 15, 2024");
        assert_eq!(
            format_date(BackendTimestamp {
                seconds: noon.timestamp(),
                nanos: 0
            }),
            "Mar 15, 2024"
        );
        assert_eq!(format_date(&FieldValue::Timestamp(noon)), "Mar 15, 2024");
        assert_eq!(format_date(Some(noon)), "Mar 15, 2024");
    }
}
