use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y%m%dT%H%M%SZ",
    "%Y%m%dT%H%M%S",
    "%Y%m%d%H%M%S",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Parses the timestamp shapes found in release and defect feeds.
///
/// Returns `None` for placeholders and anything unrecognised.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if is_placeholder(raw) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Values the feeds use in place of a missing field.
pub fn is_placeholder(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty()
        || raw.eq_ignore_ascii_case("none")
        || raw.eq_ignore_ascii_case("undefined")
        || raw.eq_ignore_ascii_case("nan")
        || raw.eq_ignore_ascii_case("null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2017-06-18T09:12:44.123Z").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2017, 6, 18));
    }

    #[test]
    fn test_parse_database_timestamp_with_offset() {
        let dt = parse_timestamp("2016-03-01 10:00:00+02").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 3, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_snapshot_timestamp() {
        let dt = parse_timestamp("20150426T040000Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2015, 4, 26, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_plain_dates() {
        let expected = Utc.with_ymd_and_hms(2018, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2018-01-31"), Some(expected));
        assert_eq!(parse_timestamp("20180131"), Some(expected));
    }

    #[test]
    fn test_placeholders_are_absent() {
        for raw in ["", "  ", "None", "nan", "undefined", "not a date"] {
            assert_eq!(parse_timestamp(raw), None, "{:?}", raw);
        }
    }
}
