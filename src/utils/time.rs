use crate::error::{parse_error, BookingResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Date format of the reservation list, e.g. "Sat, Oct 05, 2024"
pub const RESERVATION_DATE_FORMAT: &str = "%a, %b %d, %Y";

/// Clock format of the reservation list, e.g. "8:00 AM"
pub const RESERVATION_TIME_FORMAT: &str = "%I:%M %p";

/// Date format the portal's search field expects, e.g. "10/05/2024"
pub const SEARCH_DATE_FORMAT: &str = "%m/%d/%Y";

/// Separator between start and end in a time range
const RANGE_SEPARATOR: &str = " - ";

/// Parse a reservation date such as "Sat, Oct 05, 2024"
pub fn parse_reservation_date(date_str: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), RESERVATION_DATE_FORMAT)
        .map_err(|e| parse_error(&format!("Invalid reservation date '{}': {}", date_str, e)))
}

/// Parse a 12-hour clock time such as "8:00 AM"
pub fn parse_clock_time(time_str: &str) -> BookingResult<NaiveTime> {
    NaiveTime::parse_from_str(time_str.trim(), RESERVATION_TIME_FORMAT)
        .map_err(|e| parse_error(&format!("Invalid time '{}': {}", time_str, e)))
}

/// Split "8:00 AM - 9:30 AM" into its two halves
pub fn split_time_range(range: &str) -> BookingResult<(&str, &str)> {
    let (start, end) = range
        .split_once(RANGE_SEPARATOR)
        .ok_or_else(|| parse_error(&format!("Time range '{}' has no ' - ' separator", range)))?;

    if end.contains(RANGE_SEPARATOR) {
        return Err(parse_error(&format!(
            "Time range '{}' has more than two parts",
            range
        )));
    }

    Ok((start, end))
}

/// Attach a timezone to a wall-clock time, refusing skipped or repeated local times
pub fn localize(naive: NaiveDateTime, tz: Tz) -> BookingResult<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Ok(dt),
        chrono::LocalResult::Ambiguous(_, _) => Err(parse_error(&format!(
            "Ambiguous local time {} in {}",
            naive, tz
        ))),
        chrono::LocalResult::None => Err(parse_error(&format!(
            "Nonexistent local time {} in {}",
            naive, tz
        ))),
    }
}

/// Turn a reservation date and time range into a timezone-aware start and end
pub fn parse_reservation_window(
    date_str: &str,
    range_str: &str,
    tz: Tz,
) -> BookingResult<(DateTime<Tz>, DateTime<Tz>)> {
    let (start_str, end_str) = split_time_range(range_str)?;
    let date = parse_reservation_date(date_str)?;

    let start = localize(date.and_time(parse_clock_time(start_str)?), tz)?;
    let end = localize(date.and_time(parse_clock_time(end_str)?), tz)?;

    if end <= start {
        return Err(parse_error(&format!(
            "Time range '{}' does not end after it starts",
            range_str
        )));
    }

    Ok((start, end))
}

/// Parse a search date given on the command line as MM/DD/YYYY
pub fn parse_search_date(date_str: &str) -> BookingResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), SEARCH_DATE_FORMAT)
        .map_err(|e| parse_error(&format!("Invalid date '{}', expected MM/DD/YYYY: {}", date_str, e)))
}

/// Render a date the way the portal's search field expects
pub fn format_search_date(date: NaiveDate) -> String {
    date.format(SEARCH_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Los_Angeles;

    #[test]
    fn test_parse_reservation_window() {
        let (start, end) =
            parse_reservation_window("Sat, Oct 05, 2024", "8:00 AM - 9:30 AM", Los_Angeles)
                .unwrap();
        assert_eq!(start.to_rfc3339(), "2024-10-05T08:00:00-07:00");
        assert_eq!(end.to_rfc3339(), "2024-10-05T09:30:00-07:00");

        // Same input, same output
        let again =
            parse_reservation_window("Sat, Oct 05, 2024", "8:00 AM - 9:30 AM", Los_Angeles)
                .unwrap();
        assert_eq!(again, (start, end));
    }

    #[test]
    fn test_standard_time_offset() {
        let (start, end) =
            parse_reservation_window("Sat, Dec 14, 2024", "12:30 PM - 2:00 PM", Los_Angeles)
                .unwrap();
        assert_eq!(start.to_rfc3339(), "2024-12-14T12:30:00-08:00");
        assert_eq!(end.to_rfc3339(), "2024-12-14T14:00:00-08:00");
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_reservation_window("Sat, Oct 05, 2024", "8:00 AM 9:30 AM", Los_Angeles)
            .unwrap_err();
        assert!(err.to_string().contains("separator"));
    }

    #[test]
    fn test_malformed_components() {
        // Missing meridiem
        assert!(parse_reservation_window("Sat, Oct 05, 2024", "8:00 - 9:30", Los_Angeles).is_err());
        // Missing year
        assert!(
            parse_reservation_window("Sat, Oct 05", "8:00 AM - 9:30 AM", Los_Angeles).is_err()
        );
        // Weekday does not match the date
        assert!(
            parse_reservation_window("Mon, Oct 05, 2024", "8:00 AM - 9:30 AM", Los_Angeles)
                .is_err()
        );
        // Three parts
        assert!(parse_reservation_window(
            "Sat, Oct 05, 2024",
            "8:00 AM - 9:00 AM - 9:30 AM",
            Los_Angeles
        )
        .is_err());
        assert!(parse_reservation_window("", "", Los_Angeles).is_err());
    }

    #[test]
    fn test_end_before_start_rejected() {
        assert!(
            parse_reservation_window("Sat, Oct 05, 2024", "9:30 AM - 8:00 AM", Los_Angeles)
                .is_err()
        );
        assert!(
            parse_reservation_window("Sat, Oct 05, 2024", "8:00 AM - 8:00 AM", Los_Angeles)
                .is_err()
        );
    }

    #[test]
    fn test_dst_gap_rejected() {
        // 2:30 AM does not exist on 2024-03-10 in Los Angeles
        assert!(
            parse_reservation_window("Sun, Mar 10, 2024", "2:30 AM - 3:30 AM", Los_Angeles)
                .is_err()
        );
    }

    #[test]
    fn test_search_date_round_trip() {
        let date = parse_search_date("10/05/2024").unwrap();
        assert_eq!(format_search_date(date), "10/05/2024");
        assert!(parse_search_date("2024-10-05").is_err());
    }
}
