use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn to_optional_u32(value: Option<i64>, field: &str) -> Result<Option<u32>> {
    value.map(|raw| to_u32(raw, field)).transpose()
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Parse a stored tag column (`movement`, `equipment`, `body_part`).
pub fn parse_tag<T>(value: &str, field: &str) -> Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    value
        .parse()
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_tag<T>(value: Option<String>, field: &str) -> Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    value.map(|raw| parse_tag(&raw, field)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BodyPart;

    #[test]
    fn datetimes_round_trip_through_rfc3339() {
        let now = Utc::now();
        let parsed = parse_datetime(&now.to_rfc3339(), "started_at").unwrap();
        assert_eq!(parsed, now);
        assert!(parse_datetime("yesterday", "started_at").is_err());
        assert_eq!(parse_optional_datetime(None, "completed_at").unwrap(), None);
    }

    #[test]
    fn tags_and_integers_are_validated() {
        assert_eq!(parse_tag::<BodyPart>("legs", "body_part").unwrap(), BodyPart::Legs);
        assert!(parse_tag::<BodyPart>("toes", "body_part").is_err());
        assert_eq!(parse_optional_tag::<BodyPart>(None, "body_part").unwrap(), None);
        assert!(to_u32(-1, "position").is_err());
        assert_eq!(to_optional_u32(Some(60), "duration_seconds").unwrap(), Some(60));
    }
}
