//! Timestamp handling for DHIS2 tracker payloads.
//!
//! The server is inconsistent about offsets: new tracker endpoints return
//! `2023-01-01T00:00:00.000` (no offset), older ones may append `Z`, and
//! query parameters use bare dates. Everything is read as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Parse a tracker timestamp, accepting RFC 3339, offset-less ISO and bare dates
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way the tracker importer expects it
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Shift a timestamp by a signed number of calendar days, saturating at the representable range
pub fn shift_days(timestamp: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|delta| timestamp.checked_add_signed(delta))
        .unwrap_or(if days < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

pub mod iso {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

pub mod iso_option {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&super::format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_variants() {
        let expected = Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2023-02-01T00:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2023-02-01T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-02-01T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2023-02-01"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_format_uses_millis_and_z() {
        let ts = Utc.with_ymd_and_hms(2023, 5, 2, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2023-05-02T10:30:00.000Z");
    }

    #[test]
    fn test_shift_crosses_month_boundaries() {
        let start = Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap();
        let shifted = shift_days(start, 90);
        assert_eq!(shifted, Utc.with_ymd_and_hms(2023, 5, 2, 0, 0, 0).unwrap());
        assert_eq!(shift_days(shifted, -90), start);
    }

    #[test]
    fn test_shift_saturates_instead_of_overflowing() {
        let start = Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(shift_days(start, -200_000_000), DateTime::<Utc>::MIN_UTC);
        assert_eq!(shift_days(start, 200_000_000), DateTime::<Utc>::MAX_UTC);
        assert_eq!(shift_days(start, i64::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
