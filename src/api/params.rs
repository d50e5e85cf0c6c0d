use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ApiError;

/// Path ids that are not UUIDs cannot name an existing row
pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{} not found", entity)))
}

/// Optional UUID query filter; an unparseable value is a client error
pub fn parse_id_filter(raw: Option<&str>, name: &str) -> Result<Option<Uuid>, ApiError> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {}", name))),
    }
}

/// Parse a query value into one of the SCREAMING_SNAKE_CASE wire enums
pub fn parse_enum<T: DeserializeOwned>(raw: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {} '{}'", name, s))),
    }
}

/// `true`/`false` query flags
pub fn parse_flag(raw: Option<&str>, name: &str) -> Result<Option<bool>, ApiError> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(s) => Err(ApiError::bad_request(format!("Invalid {} '{}', expected true or false", name, s))),
    }
}

/// Distinguishes an absent PATCH field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("invalid date '{}', expected ISO 8601", raw))
}

pub mod datetime {
    use super::*;
    use serde::de::Error;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_datetime(&raw).map_err(D::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse_datetime(&raw).map(Some).map_err(D::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        category_id: Option<Option<Uuid>>,
    }

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.category_id, None);

        let null: Patch = serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(null.category_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_str(&format!(r#"{{"category_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.category_id, Some(Some(id)));
    }

    #[test]
    fn parses_dates_and_timestamps() {
        let d = parse_datetime("2024-03-05").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 5));

        let t = parse_datetime("2024-03-05T10:00:00+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-03-05T08:00:00+00:00");

        assert!(parse_datetime("next tuesday").is_err());
    }

    #[test]
    fn enum_and_flag_queries() {
        use crate::types::TransactionType;
        assert_eq!(parse_enum::<TransactionType>(Some("INCOME"), "type").unwrap(), Some(TransactionType::Income));
        assert_eq!(parse_enum::<TransactionType>(None, "type").unwrap(), None);
        assert!(parse_enum::<TransactionType>(Some("income"), "type").is_err());
        assert_eq!(parse_flag(Some("false"), "read").unwrap(), Some(false));
        assert!(parse_flag(Some("yes"), "read").is_err());
    }

    #[test]
    fn bad_path_id_is_404() {
        assert_eq!(parse_id("not-a-uuid", "Bill").unwrap_err().status_code(), 404);
    }

    #[test]
    fn id_filters() {
        assert_eq!(parse_id_filter(None, "teamId").unwrap(), None);
        assert_eq!(parse_id_filter(Some(""), "teamId").unwrap(), None);
        assert_eq!(parse_id_filter(Some("x"), "teamId").unwrap_err().status_code(), 400);
    }
}
