//! Row-level parsing of the history export.
//!
//! Columns: date, session name, duration, exercise name, set order (1-based),
//! weight, reps, distance, seconds, effort, then optional body part and
//! equipment tags. Unusable optional values become `None`; only a short row
//! is rejected.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::models::{BodyPart, EquipmentType, SetValues};

/// Fewest fields a data row may have.
pub const MIN_FIELDS: usize = 10;

static HOURS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)h").expect("hours pattern is valid"));
static MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)m").expect("minutes pattern is valid"));
static SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)s").expect("seconds pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub date: String,
    pub session_name: String,
    pub duration: String,
    pub exercise_name: String,
    /// 0-based.
    pub set_order: u32,
    pub values: SetValues,
    pub body_part: Option<BodyPart>,
    pub equipment: Option<EquipmentType>,
}

/// Parsed data rows and the number of rows that could not be used.
#[derive(Debug, Default)]
pub struct ParsedExport {
    pub rows: Vec<ImportRow>,
    pub skipped: usize,
}

/// Parse a whole export. The first line is a header; blank lines are ignored.
pub fn parse_export(raw: &str) -> ParsedExport {
    let mut parsed = ParsedExport::default();
    for (index, line) in raw.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(line);
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        match parse_row(&fields) {
            Some(row) => parsed.rows.push(row),
            None => {
                debug!("Skipping line {} with {} fields", index + 1, fields.len());
                parsed.skipped += 1;
            }
        }
    }
    parsed
}

/// Split one line on commas. A `"` anywhere toggles quoted mode and is
/// dropped; commas inside quotes are kept. Fields are trimmed.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Build a row from its fields, or `None` when there are too few.
pub fn parse_row(fields: &[&str]) -> Option<ImportRow> {
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let order = fields[4].parse::<i64>().unwrap_or(1);
    let set_order = u32::try_from(order.saturating_sub(1)).unwrap_or(0);

    Some(ImportRow {
        date: fields[0].to_string(),
        session_name: fields[1].to_string(),
        duration: fields[2].to_string(),
        exercise_name: fields[3].to_string(),
        set_order,
        values: SetValues {
            weight: parse_number(fields[5]),
            reps: fields[6].parse::<i64>().ok(),
            distance: parse_number(fields[7]),
            seconds: parse_number(fields[8]),
            rpe: parse_number(fields[9]),
        },
        body_part: fields.get(10).and_then(|tag| tag.parse().ok()),
        equipment: fields.get(11).and_then(|tag| tag.parse().ok()),
    })
}

fn parse_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// "yyyy-MM-dd HH:mm:ss" or "yyyy-MM-dd", in local time.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Seconds in a duration like "1h30m", "45m" or "0h45m0s". Each component
/// is optional; anything unrecognised contributes nothing.
pub fn parse_duration(value: &str) -> u32 {
    let component = |pattern: &Regex| -> u32 {
        pattern
            .captures(value)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };

    component(&HOURS)
        .saturating_mul(3600)
        .saturating_add(component(&MINUTES).saturating_mul(60))
        .saturating_add(component(&SECONDS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1h30m"), 5400);
        assert_eq!(parse_duration("45m"), 2700);
        assert_eq!(parse_duration("90s"), 90);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("0h45m0s"), 2700);
        assert_eq!(parse_duration("1h 2m 3s"), 3723);
        assert_eq!(parse_duration("soon"), 0);
    }

    #[test]
    fn dates_accept_time_or_date_only() {
        let with_time = parse_date("2024-03-05 18:30:00").unwrap();
        let date_only = parse_date("2024-03-05").unwrap();
        assert_eq!((with_time - date_only).num_seconds(), 18 * 3600 + 30 * 60);
        assert!(parse_date("05/03/2024").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn optional_fields_degrade_to_none() {
        let fields = [
            "2024-03-05 18:30:00", "Push", "1h", "Bench Press", "2", "abc", "0", "", "NaN", "8.5",
        ];
        let row = parse_row(&fields).unwrap();
        assert_eq!(row.set_order, 1);
        assert_eq!(row.values.weight, None);
        assert_eq!(row.values.reps, Some(0));
        assert_eq!(row.values.distance, None);
        assert_eq!(row.values.seconds, None);
        assert_eq!(row.values.rpe, Some(8.5));
        assert_eq!(row.body_part, None);
        assert_eq!(row.equipment, None);
    }

    #[test]
    fn tags_and_bad_set_orders() {
        let fields = [
            "2024-03-05", "Legs", "", "Squat", "zero", "100", "5", "", "", "", "legs", "barbell",
        ];
        let row = parse_row(&fields).unwrap();
        assert_eq!(row.set_order, 0);
        assert_eq!(row.body_part, Some(BodyPart::Legs));
        assert_eq!(row.equipment, Some(EquipmentType::Barbell));

        let mut fields = fields;
        fields[4] = "0";
        fields[10] = "toes";
        let row = parse_row(&fields).unwrap();
        assert_eq!(row.set_order, 0);
        assert_eq!(row.body_part, None);
    }

    #[test]
    fn short_rows_are_rejected() {
        assert!(parse_row(&["2024-03-05", "Push", "1h"]).is_none());
    }

    #[test]
    fn quotes_toggle_anywhere_and_are_dropped() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            ("a,b,c", vec!["a", "b", "c"]),
            (r#"x, "Press, Incline", 2"#, vec!["x", "Press, Incline", "2"]),
            (r#"Bench "Paused",5"#, vec!["Bench Paused", "5"]),
            (r#""a""b",c"#, vec!["ab", "c"]),
            (r#""unterminated, still one field"#, vec!["unterminated, still one field"]),
            ("trailing,", vec!["trailing", ""]),
        ];
        for (line, expected) in cases {
            assert_eq!(split_fields(line), expected, "line {line:?}");
        }
    }

    #[test]
    fn spaced_row_with_quoted_name_keeps_columns_aligned() {
        let raw = "Date,Workout Name,Duration,Exercise Name,Set Order,Weight,Reps,Distance,Seconds,RPE\n\
                   2024-03-05 18:30:00, Push, 1h, \"Press, Incline\", 2, 30, 10, , , \n\
                   2024-03-05 18:30:00,Push,1h,Bench \"Paused\",1,60,5,,,\r\n";
        let parsed = parse_export(raw);

        assert_eq!(parsed.skipped, 0);
        let press = &parsed.rows[0];
        assert_eq!(press.exercise_name, "Press, Incline");
        assert_eq!(press.set_order, 1);
        assert_eq!(press.values.weight, Some(30.0));
        assert_eq!(press.values.reps, Some(10));
        assert_eq!(press.values.rpe, None);

        let paused = &parsed.rows[1];
        assert_eq!(paused.exercise_name, "Bench Paused");
        assert_eq!(paused.values.weight, Some(60.0));
    }

    #[test]
    fn export_skips_header_and_counts_bad_rows() {
        let raw = "Date,Workout Name,Duration,Exercise Name,Set Order,Weight,Reps,Distance,Seconds,RPE\n\
                   2024-03-05 18:30:00,Push,1h,\"Press, Incline (Dumbbell)\",1,30,10,,,\n\
                   \n\
                   2024-03-05 18:30:00,Push,1h\n\
                   2024-03-05 18:30:00 , Push , 1h , Dip , 1 , , 12 , , , \n";
        let parsed = parse_export(raw);

        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].exercise_name, "Press, Incline (Dumbbell)");
        assert_eq!(parsed.rows[0].values.weight, Some(30.0));
        assert_eq!(parsed.rows[1].exercise_name, "Dip");
        assert_eq!(parsed.rows[1].session_name, "Push");
        assert_eq!(parsed.rows[1].values.reps, Some(12));
    }
}
