use crate::components::portal::{BookingPortal, SlotLookup};
use crate::error::BookingResult;
use std::time::Duration;
use tracing::info;

/// Bounds of the slot polling loop
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Number of full passes over the candidate list
    pub max_attempts: u32,
    /// How long each candidate is waited for in one pass
    pub slot_timeout: Duration,
    /// Press search again between passes to refresh the slot list
    pub refresh_search: bool,
}

/// How a polling run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A slot was found and clicked
    Selected { label: String, attempt: u32 },
    /// No candidate showed up in any attempt
    Exhausted { attempts: u32 },
}

/// Poll the result list until one of `candidates` can be clicked or the attempts run out.
///
/// Candidates are tried in order and the first one found wins, so at most one slot is clicked.
pub async fn poll_for_slot<P>(
    portal: &mut P,
    candidates: &[String],
    settings: &PollSettings,
) -> BookingResult<PollOutcome>
where
    P: BookingPortal + ?Sized,
{
    for attempt in 1..=settings.max_attempts {
        for label in candidates {
            if let SlotLookup::Found(found) = portal.select_slot(label, settings.slot_timeout).await? {
                info!("Found start time {} on attempt {}", found, attempt);
                return Ok(PollOutcome::Selected {
                    label: found,
                    attempt,
                });
            }
        }

        info!(
            "Attempt {}/{}: none of the start times {:?} found",
            attempt, settings.max_attempts, candidates
        );

        if settings.refresh_search && attempt < settings.max_attempts {
            portal.search().await?;
        }
    }

    Ok(PollOutcome::Exhausted {
        attempts: settings.max_attempts,
    })
}
