use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds since the unix epoch with sub-second precision.
pub fn unix_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

/// Parses an RFC3339 timestamp with optional fractional seconds, as the
/// Docker daemon reports them (`2024-03-01T10:15:30.123456789Z`).
pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{parse_rfc3339, unix_seconds};

    #[test]
    fn parses_nanosecond_timestamps() {
        let parsed = parse_rfc3339("2024-03-01T10:15:30.123456789Z").unwrap();
        assert_eq!(parsed.timestamp(), 1_709_288_130);
        assert_eq!(parsed.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn parses_offsets() {
        let parsed = parse_rfc3339("2024-03-01T12:15:30+02:00").unwrap();
        assert_eq!(parsed.timestamp(), 1_709_288_130);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_rfc3339("").is_none());
        assert!(parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn unix_seconds_keeps_fraction() {
        let parsed = parse_rfc3339("1970-01-01T00:00:01.5Z").unwrap();
        assert!((unix_seconds(&parsed) - 1.5).abs() < f64::EPSILON);
    }
}
