use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::BookingResult;
use crate::utils::time::parse_reservation_window;

/// One row of the portal's reservation list
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReservationRow {
    /// e.g. "Sat, Oct 05, 2024"
    pub date: String,
    /// e.g. "8:00 AM - 9:30 AM"
    pub time_range: String,
    pub activity: String,
}

impl ReservationRow {
    pub fn new(date: &str, time_range: &str, activity: &str) -> Self {
        Self {
            date: date.to_string(),
            time_range: time_range.to_string(),
            activity: activity.to_string(),
        }
    }

    /// Format the row for terminal output
    pub fn format(&self) -> String {
        format!("{:<20} {:<22} {}", self.date, self.time_range, self.activity)
    }
}

/// A reservation ready to be written to the calendar
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub summary: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub location: String,
}

impl NormalizedEvent {
    /// Derive an event from a reservation row in the given timezone
    pub fn from_row(row: &ReservationRow, tz: Tz, location: &str) -> BookingResult<Self> {
        let (start, end) = parse_reservation_window(&row.date, &row.time_range, tz)?;

        Ok(Self {
            summary: row.activity.clone(),
            start,
            end,
            location: location.to_string(),
        })
    }

    /// Start as an RFC 3339 timestamp with offset
    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339()
    }

    /// End as an RFC 3339 timestamp with offset
    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339()
    }
}
