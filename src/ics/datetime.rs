use chrono::{
    DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

/// Normalize a raw ICS timestamp value into an absolute instant.
///
/// Accepted inputs, tried in order:
/// - the compact calendar form `YYYYMMDD[THHMMSS][Z]`, optionally preceded
///   by parameter text up to a colon (e.g. `TZID=Europe/London:...`);
/// - an RFC 3339 date-time;
/// - a naive `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD HH:MM:SS`, read as local
///   time.
///
/// A date without a time component is due at the end of that day, so the
/// time defaults to 23:59:59. A trailing `Z` marks UTC; otherwise the value
/// is interpreted in the local time zone of the running process.
///
/// Returns `None` when nothing matches; callers drop the record.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // Discard any leading parameter block (everything through the first colon).
    let cleaned = match raw.find(':') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };
    let cleaned = cleaned.trim();

    if let Some(instant) = parse_compact(cleaned) {
        return Some(instant);
    }

    parse_fallback(cleaned)
}

fn parse_compact(value: &str) -> Option<DateTime<Utc>> {
    let is_utc = value.ends_with('Z');
    let digits = value.strip_suffix('Z').unwrap_or(value);

    let (date_part, time_part) = match digits.len() {
        8 => (digits, None),
        15 => {
            let (date, rest) = digits.split_at(8);
            (date, Some(rest.strip_prefix('T')?))
        }
        _ => return None,
    };

    if !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let time = match time_part {
        Some(t) => {
            if !t.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let hour: u32 = t[0..2].parse().ok()?;
            let minute: u32 = t[2..4].parse().ok()?;
            let second: u32 = t[4..6].parse().ok()?;
            NaiveTime::from_hms_opt(hour, minute, second)?
        }
        None => NaiveTime::from_hms_opt(23, 59, 59)?,
    };

    let naive = NaiveDateTime::new(date, time);
    if is_utc {
        Some(Utc.from_utc_datetime(&naive))
    } else {
        local_to_utc(naive)
    }
}

fn parse_fallback(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return local_to_utc(naive);
        }
    }

    None
}

/// Resolve a naive local time to UTC. Times that fall into a DST fold take
/// the earlier candidate; times inside a spring-forward gap do not exist
/// and resolve to `None`.
fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        let naive = NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap();
        local_to_utc(naive).unwrap()
    }

    #[test]
    fn date_only_defaults_to_end_of_day() {
        assert_eq!(
            parse_timestamp("20240315"),
            Some(local(2024, 3, 15, 23, 59, 59))
        );
    }

    #[test]
    fn utc_suffix_is_respected() {
        assert_eq!(
            parse_timestamp("20240315T235959Z"),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn datetime_without_suffix_is_local() {
        assert_eq!(
            parse_timestamp("20240601T120000"),
            Some(local(2024, 6, 1, 12, 0, 0))
        );
    }

    #[test]
    fn date_only_with_utc_suffix() {
        assert_eq!(
            parse_timestamp("20240315Z"),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn parameter_prefix_is_stripped() {
        assert_eq!(
            parse_timestamp("TZID=Asia/Tokyo:20240601T120000"),
            Some(local(2024, 6, 1, 12, 0, 0))
        );
    }

    #[test]
    fn rfc3339_fallback() {
        assert_eq!(
            parse_timestamp("2024-03-15T10:00:00+09:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn naive_iso_fallback_is_local() {
        assert_eq!(
            parse_timestamp("2024-06-01T09:30:00"),
            Some(local(2024, 6, 1, 9, 30, 0))
        );
    }

    #[test]
    fn invalid_calendar_dates_are_rejected() {
        assert_eq!(parse_timestamp("20241315"), None);
        assert_eq!(parse_timestamp("20240230"), None);
        assert_eq!(parse_timestamp("20240315T250000"), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2024031"), None);
        assert_eq!(parse_timestamp("20240315X120000"), None);
    }
}
