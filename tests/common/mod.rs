#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use courtbot::components::google_calendar::{CalendarEvent, CalendarService};
use courtbot::components::portal::{BookingPortal, SlotLookup};
use courtbot::config::PortalCredentials;
use courtbot::error::{google_calendar_error, portal_error, BookingResult};
use courtbot::models::NormalizedEvent;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub const RESERVATION_TABLE: &str = r#"
<table id="table-reservation-list">
  <thead>
    <tr><th colspan="2">Your Reservations</th><th>Activity</th><th></th></tr>
  </thead>
  <tbody>
    <tr><td>Sat, Oct 05, 2024</td><td>8:00 AM - 9:30 AM</td><td>Tennis Court 4</td><td>Cancel</td></tr>
    <tr><td>Sun, Oct 06, 2024</td><td>10:00 AM - 11:00 AM</td><td>Tennis Court 2</td><td>Cancel</td></tr>
  </tbody>
</table>
"#;

pub const EMPTY_TABLE: &str = r#"
<table id="table-reservation-list">
  <thead><tr><th colspan="2">Your Reservations</th><th>Activity</th></tr></thead>
  <tbody></tbody>
</table>
"#;

pub fn credentials() -> PortalCredentials {
    PortalCredentials {
        username: "player@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

/// Mock implementation of the booking portal for testing
#[derive(Debug, Default)]
pub struct MockPortal {
    /// Label -> the probe number (1-based) from which the slot can be clicked
    pub available_on: HashMap<String, usize>,
    /// Name of a method that should fail with a portal error
    pub fail_on: Option<&'static str>,
    pub table_html: String,
    /// Every call in order
    pub calls: Vec<String>,
    pub probes: HashMap<String, usize>,
    pub clicked: Vec<String>,
    pub closed: bool,
}

impl MockPortal {
    /// Create a portal whose slots never become available
    pub fn new() -> Self {
        Self {
            table_html: RESERVATION_TABLE.to_string(),
            ..Default::default()
        }
    }

    /// Make `label` clickable starting with its `probe`-th lookup
    pub fn with_slot(mut self, label: &str, probe: usize) -> Self {
        self.available_on.insert(label.to_string(), probe);
        self
    }

    pub fn failing_on(mut self, method: &'static str) -> Self {
        self.fail_on = Some(method);
        self
    }

    pub fn with_table(mut self, html: &str) -> Self {
        self.table_html = html.to_string();
        self
    }

    pub fn probe_count(&self, label: &str) -> usize {
        self.probes.get(label).copied().unwrap_or(0)
    }

    pub fn count_calls(&self, method: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == method).count()
    }

    fn record(&mut self, method: &'static str) -> BookingResult<()> {
        self.calls.push(method.to_string());
        if self.fail_on == Some(method) {
            return Err(portal_error(&format!("{} gate not reached", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingPortal for MockPortal {
    async fn login(&mut self, _credentials: &PortalCredentials) -> BookingResult<()> {
        self.record("login")
    }

    async fn open_reservations(&mut self) -> BookingResult<()> {
        self.record("open_reservations")
    }

    async fn set_search_criteria(&mut self, _date: NaiveDate, _duration_minutes: u32) -> BookingResult<()> {
        self.record("set_search_criteria")
    }

    async fn search(&mut self) -> BookingResult<()> {
        self.record("search")
    }

    async fn select_slot(&mut self, label: &str, _timeout: Duration) -> BookingResult<SlotLookup> {
        self.record("select_slot")?;
        let probe = {
            let count = self.probes.entry(label.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        match self.available_on.get(label) {
            Some(from) if probe >= *from => {
                self.clicked.push(label.to_string());
                Ok(SlotLookup::Found(label.to_string()))
            }
            _ => Ok(SlotLookup::NotFoundThisAttempt),
        }
    }

    async fn confirm(&mut self) -> BookingResult<()> {
        self.record("confirm")
    }

    async fn complete(&mut self) -> BookingResult<()> {
        self.record("complete")
    }

    async fn reservation_table_html(&mut self) -> BookingResult<String> {
        self.record("reservation_table_html")?;
        Ok(self.table_html.clone())
    }

    async fn close(&mut self) -> BookingResult<()> {
        self.record("close")?;
        self.closed = true;
        Ok(())
    }
}

/// Mock implementation of the calendar service for testing
#[derive(Debug, Default)]
pub struct MockCalendar {
    pub events: Mutex<Vec<CalendarEvent>>,
    /// Window starts (RFC 3339) whose duplicate check fails
    pub fail_list_at: HashSet<String>,
    /// Every duplicate check fails
    pub fail_all_lists: bool,
    /// Summaries whose insert fails
    pub fail_insert_for: HashSet<String>,
    pub list_calls: Mutex<usize>,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_list_at(mut self, start: &str) -> Self {
        self.fail_list_at.insert(start.to_string());
        self
    }

    pub fn failing_all_lists(mut self) -> Self {
        self.fail_all_lists = true;
        self
    }

    pub fn failing_insert_for(mut self, summary: &str) -> Self {
        self.fail_insert_for.insert(summary.to_string());
        self
    }

    /// Pre-populate an event
    pub fn with_event(self, summary: &str, start: &str, end: &str) -> Self {
        {
            let mut events = self.events.lock().unwrap();
            let id = format!("existing{}", events.len() + 1);
            events.push(CalendarEvent {
                id,
                summary: Some(summary.to_string()),
                start_date_time: Some(start.to_string()),
                end_date_time: Some(end.to_string()),
                ..Default::default()
            });
        }
        self
    }

    pub fn stored(&self) -> Vec<CalendarEvent> {
        self.events.lock().unwrap().clone()
    }

    fn overlaps(event: &CalendarEvent, start: &DateTime<Tz>, end: &DateTime<Tz>) -> bool {
        let parse = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        };
        match (parse(&event.start_date_time), parse(&event.end_date_time)) {
            (Some(event_start), Some(event_end)) => event_start < *end && event_end > *start,
            _ => false,
        }
    }
}

#[async_trait]
impl CalendarService for MockCalendar {
    async fn list_events(
        &self,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> BookingResult<Vec<CalendarEvent>> {
        *self.list_calls.lock().unwrap() += 1;

        if self.fail_all_lists || self.fail_list_at.contains(&start.to_rfc3339()) {
            return Err(google_calendar_error("HTTP 503 - backend unavailable"));
        }

        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| Self::overlaps(e, start, end))
            .cloned()
            .collect())
    }

    async fn insert_event(&self, event: &NormalizedEvent) -> BookingResult<CalendarEvent> {
        if self.fail_insert_for.contains(&event.summary) {
            return Err(google_calendar_error("HTTP 500 - insert failed"));
        }

        let mut events = self.events.lock().unwrap();
        let created = CalendarEvent {
            id: format!("created{}", events.len() + 1),
            summary: Some(event.summary.clone()),
            start_date_time: Some(event.start_rfc3339()),
            end_date_time: Some(event.end_rfc3339()),
            ..Default::default()
        };
        events.push(created.clone());
        Ok(created)
    }
}
