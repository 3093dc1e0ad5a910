mod webdriver;

pub use webdriver::WebDriverPortal;

use crate::config::PortalCredentials;
use crate::error::BookingResult;
use crate::models::ReservationRow;
use crate::utils::table::parse_reservation_table;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// Result of probing the page for one slot label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotLookup {
    /// The slot link appeared and was clicked
    Found(String),
    /// The slot did not become clickable within the probe timeout
    NotFoundThisAttempt,
}

/// Operations the booking pipelines need from the club portal.
///
/// Every structural method waits for its gate element and fails when the gate is not reached in time.
/// `select_slot` is the only probing operation: misses are reported as `SlotLookup::NotFoundThisAttempt`,
/// and an `Err` from it means the session itself is unusable.
#[async_trait]
pub trait BookingPortal: Send {
    /// Sign in and wait for the member home page
    async fn login(&mut self, credentials: &PortalCredentials) -> BookingResult<()>;

    /// Go to the court reservation page
    async fn open_reservations(&mut self) -> BookingResult<()>;

    /// Fill in the date and pick the reservation length
    async fn set_search_criteria(&mut self, date: NaiveDate, duration_minutes: u32) -> BookingResult<()>;

    /// Press the search button
    async fn search(&mut self) -> BookingResult<()>;

    /// Wait up to `timeout` for a slot link containing `label` and click it
    async fn select_slot(&mut self, label: &str, timeout: Duration) -> BookingResult<SlotLookup>;

    /// Press the confirm button of the reservation dialog
    async fn confirm(&mut self) -> BookingResult<()>;

    /// Acknowledge the completion dialog
    async fn complete(&mut self) -> BookingResult<()>;

    /// Outer HTML of the member's reservation list
    async fn reservation_table_html(&mut self) -> BookingResult<String>;

    /// Release the browser session
    async fn close(&mut self) -> BookingResult<()>;

    /// Read and parse the reservation list
    async fn extract_table(&mut self) -> BookingResult<Vec<ReservationRow>> {
        let html = self.reservation_table_html().await?;
        parse_reservation_table(&html)
    }
}
