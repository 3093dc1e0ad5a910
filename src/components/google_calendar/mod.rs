mod client;
pub mod models;
pub mod token;

pub use client::GoogleCalendarClient;
pub use models::CalendarEvent;

use crate::error::BookingResult;
use crate::models::NormalizedEvent;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;

/// Calendar operations the sync pipeline relies on
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Events overlapping `[start, end]`, expanded to single instances and ordered by start
    async fn list_events(
        &self,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> BookingResult<Vec<CalendarEvent>>;

    /// Create an event and return it as stored
    async fn insert_event(&self, event: &NormalizedEvent) -> BookingResult<CalendarEvent>;
}
