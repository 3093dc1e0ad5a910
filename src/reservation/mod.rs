mod poller;

pub use poller::{poll_for_slot, PollOutcome, PollSettings};

use crate::components::portal::BookingPortal;
use crate::config::PortalCredentials;
use crate::error::BookingResult;
use crate::models::ReservationRow;
use chrono::NaiveDate;
use std::fmt;
use tracing::info;

/// Progress of a reservation run. Stages only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReservationStage {
    LoggedOut,
    LoggedIn,
    Searching,
    SlotFound,
    Confirmed,
    Completed,
}

impl ReservationStage {
    /// The stage that follows this one
    pub fn next(self) -> Option<Self> {
        match self {
            ReservationStage::LoggedOut => Some(ReservationStage::LoggedIn),
            ReservationStage::LoggedIn => Some(ReservationStage::Searching),
            ReservationStage::Searching => Some(ReservationStage::SlotFound),
            ReservationStage::SlotFound => Some(ReservationStage::Confirmed),
            ReservationStage::Confirmed => Some(ReservationStage::Completed),
            ReservationStage::Completed => None,
        }
    }
}

impl fmt::Display for ReservationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReservationStage::LoggedOut => "logged-out",
            ReservationStage::LoggedIn => "logged-in",
            ReservationStage::Searching => "searching",
            ReservationStage::SlotFound => "slot-found",
            ReservationStage::Confirmed => "confirmed",
            ReservationStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Tracks the current stage so failures can name the gate that was not reached
#[derive(Debug, Clone)]
pub struct StageMachine {
    current: ReservationStage,
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StageMachine {
    pub fn new() -> Self {
        Self {
            current: ReservationStage::LoggedOut,
        }
    }

    pub fn current(&self) -> ReservationStage {
        self.current
    }

    /// The stage the run is trying to reach
    pub fn pending(&self) -> ReservationStage {
        self.current.next().unwrap_or(self.current)
    }

    /// Move to the next stage and return it
    pub fn advance(&mut self) -> ReservationStage {
        self.current = self.pending();
        info!(stage = %self.current, "Reservation stage reached");
        self.current
    }
}

/// What the caller asked to book
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub date: NaiveDate,
    /// Acceptable start time labels, most preferred first
    pub candidates: Vec<String>,
    pub duration_minutes: u32,
    pub poll: PollSettings,
}

/// How a reservation run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// A slot was booked; `reservations` is the member's list afterwards
    Booked {
        slot: String,
        attempt: u32,
        reservations: Vec<ReservationRow>,
    },
    /// None of the candidates became available
    NoSlotAvailable { attempts: u32 },
}

/// Book a court: log in, search, poll for a slot, confirm, and read back the reservation list.
///
/// Structural failures abort the run with the stage that was not reached. Running out of attempts is
/// reported as `ReservationOutcome::NoSlotAvailable` and nothing is confirmed.
pub async fn make_reservation<P>(
    portal: &mut P,
    credentials: &PortalCredentials,
    request: &ReservationRequest,
) -> BookingResult<ReservationOutcome>
where
    P: BookingPortal + ?Sized,
{
    let mut stages = StageMachine::new();

    portal
        .login(credentials)
        .await
        .map_err(|e| e.at_stage(stages.pending()))?;
    stages.advance();

    portal
        .open_reservations()
        .await
        .map_err(|e| e.at_stage(stages.pending()))?;
    portal
        .set_search_criteria(request.date, request.duration_minutes)
        .await
        .map_err(|e| e.at_stage(stages.pending()))?;
    portal
        .search()
        .await
        .map_err(|e| e.at_stage(stages.pending()))?;
    stages.advance();

    let (slot, attempt) = match poll_for_slot(&mut *portal, &request.candidates, &request.poll)
        .await
        .map_err(|e| e.at_stage(stages.pending()))?
    {
        PollOutcome::Selected { label, attempt } => (label, attempt),
        PollOutcome::Exhausted { attempts } => {
            info!(
                "After {} attempts, none of the start times were found: {:?}",
                attempts, request.candidates
            );
            return Ok(ReservationOutcome::NoSlotAvailable { attempts });
        }
    };
    stages.advance();

    portal
        .confirm()
        .await
        .map_err(|e| e.at_stage(stages.pending()))?;
    stages.advance();

    portal
        .complete()
        .await
        .map_err(|e| e.at_stage(stages.pending()))?;
    stages.advance();

    let reservations = portal.extract_table().await?;

    Ok(ReservationOutcome::Booked {
        slot,
        attempt,
        reservations,
    })
}

/// Read the member's current reservations without booking anything
pub async fn fetch_reservations<P>(
    portal: &mut P,
    credentials: &PortalCredentials,
) -> BookingResult<Vec<ReservationRow>>
where
    P: BookingPortal + ?Sized,
{
    portal
        .login(credentials)
        .await
        .map_err(|e| e.at_stage(ReservationStage::LoggedIn))?;
    portal.open_reservations().await?;

    let rows = portal.extract_table().await?;
    info!("Found {} reservations", rows.len());
    Ok(rows)
}
