use crate::components::google_calendar::CalendarService;
use crate::config::DuplicateCheckPolicy;
use crate::error::BookingResult;
use crate::models::{NormalizedEvent, ReservationRow};
use chrono_tz::Tz;
use tracing::{error, info, warn};

/// What happened to one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Inserted,
    Duplicate,
}

/// Parameters shared by every row of a sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub timezone: Tz,
    pub location: String,
    pub duplicate_policy: DuplicateCheckPolicy,
}

/// A row that could not be synced
#[derive(Debug, Clone)]
pub struct RowFailure {
    /// Zero-based position in the reservation table
    pub index: usize,
    pub row: ReservationRow,
    pub reason: String,
}

/// Summary of a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: Vec<RowFailure>,
}

impl SyncReport {
    pub fn processed(&self) -> usize {
        self.inserted + self.duplicates + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Whether the calendar already has an event with this exact title inside the event's window
pub async fn find_duplicate<C>(calendar: &C, event: &NormalizedEvent) -> BookingResult<bool>
where
    C: CalendarService + ?Sized,
{
    let existing = calendar.list_events(&event.start, &event.end).await?;

    match existing
        .iter()
        .find(|e| e.summary.as_deref() == Some(event.summary.as_str()))
    {
        Some(duplicate) => {
            info!(
                "Duplicate event found: {}",
                duplicate.html_link.as_deref().unwrap_or(&duplicate.id)
            );
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Insert an event unless it is already on the calendar.
///
/// A failed duplicate check is resolved by `policy`: `FailOpen` inserts anyway, `FailClosed` returns the error.
pub async fn sync_event<C>(
    calendar: &C,
    event: &NormalizedEvent,
    policy: DuplicateCheckPolicy,
) -> BookingResult<SyncAction>
where
    C: CalendarService + ?Sized,
{
    let duplicate = match find_duplicate(calendar, event).await {
        Ok(duplicate) => duplicate,
        Err(e) => match policy {
            DuplicateCheckPolicy::FailOpen => {
                warn!(
                    "Error checking for duplicate of '{}', inserting anyway: {}",
                    event.summary, e
                );
                false
            }
            DuplicateCheckPolicy::FailClosed => return Err(e),
        },
    };

    if duplicate {
        info!("Event creation skipped: '{}' already exists", event.summary);
        return Ok(SyncAction::Duplicate);
    }

    calendar.insert_event(event).await?;
    Ok(SyncAction::Inserted)
}

/// Mirror reservation rows onto the calendar.
///
/// Each row is handled on its own: a row that fails to parse or sync is recorded in the report and the
/// remaining rows are still processed.
pub async fn sync_reservations<C>(
    calendar: &C,
    rows: &[ReservationRow],
    options: &SyncOptions,
) -> SyncReport
where
    C: CalendarService + ?Sized,
{
    let mut report = SyncReport::default();

    for (index, row) in rows.iter().enumerate() {
        let result = match NormalizedEvent::from_row(row, options.timezone, &options.location) {
            Ok(event) => sync_event(calendar, &event, options.duplicate_policy).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(SyncAction::Inserted) => report.inserted += 1,
            Ok(SyncAction::Duplicate) => report.duplicates += 1,
            Err(e) => {
                error!("Failed to process row {}: {}", index, e);
                report.failed.push(RowFailure {
                    index,
                    row: row.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Calendar sync finished: {} inserted, {} duplicates, {} failed",
        report.inserted,
        report.duplicates,
        report.failed.len()
    );
    report
}
