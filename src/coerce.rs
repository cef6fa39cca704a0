//! Normalize user-supplied date and identifier values into store-native
//! types. Kept separate from the query compiler so both the compiler and
//! the entry builder can reuse the same coercion rules.

use bson::oid::ObjectId;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::QueryError;

/// The shapes a caller may pass for a date-valued field.
pub enum DateInput {
    /// Already a native timestamp.
    DateTime(DateTime<Utc>),
    /// An RFC 3339 or otherwise `chrono`-parseable date/time string.
    Text(String),
    /// A numeric epoch in milliseconds.
    EpochMillis(i64),
}

/// Coerce a [`DateInput`] into a `bson::DateTime`, failing the caller on an
/// unparseable string rather than silently defaulting.
pub fn coerce_date(input: DateInput) -> Result<bson::DateTime, QueryError> {
    let dt = match input {
        DateInput::DateTime(dt) => dt,
        DateInput::EpochMillis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| QueryError::InvalidDate(format!("out-of-range epoch millis: {ms}")))?,
        DateInput::Text(s) => parse_date_string(&s)?,
    };
    Ok(bson::DateTime::from_chrono(dt))
}

fn parse_date_string(s: &str) -> Result<DateTime<Utc>, QueryError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| QueryError::InvalidDate(s.to_string()))?;
        return Ok(naive.and_utc());
    }
    Err(QueryError::InvalidDate(s.to_string()))
}

/// Coerce a string into a document identifier, used for `_journal` filters.
pub fn coerce_object_id(s: &str) -> Result<ObjectId, QueryError> {
    ObjectId::parse_str(s).map_err(|e| QueryError::InvalidIdentifier(format!("{s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let d = coerce_date(DateInput::Text("2024-06-01T00:00:00Z".into())).unwrap();
        assert_eq!(d.to_chrono().date_naive().to_string(), "2024-06-01");
    }

    #[test]
    fn parses_plain_date() {
        let d = coerce_date(DateInput::Text("2024-06-01".into())).unwrap();
        assert_eq!(d.to_chrono().date_naive().to_string(), "2024-06-01");
    }

    #[test]
    fn parses_epoch_millis() {
        let d = coerce_date(DateInput::EpochMillis(1_717_200_000_000)).unwrap();
        assert_eq!(d.to_chrono().date_naive().to_string(), "2024-05-31");
    }

    #[test]
    fn rejects_garbage_string() {
        assert!(coerce_date(DateInput::Text("not-a-date".into())).is_err());
    }
}
