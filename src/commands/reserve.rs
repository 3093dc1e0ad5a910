use super::{
    calendar_client, open_portal, print_reservations, print_sync_report, reserve_then_release, sync_options,
};
use crate::config::{CalendarAccess, Config};
use crate::error::BookingResult;
use crate::reservation::{PollSettings, ReservationOutcome, ReservationRequest};
use crate::sync::sync_reservations;
use crate::utils::time::parse_search_date;
use chrono::NaiveDate;
use clap::Args;
use tracing::info;

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_search_date(value).map_err(|e| e.to_string())
}

#[derive(Debug, Args)]
pub struct ReserveArgs {
    /// Target reservation date in MM/DD/YYYY format
    #[arg(long, value_parser = parse_date_arg)]
    pub reservation_date: NaiveDate,

    /// Start times to look for, most preferred first, e.g. 8:00am 8:30am
    #[arg(long, num_args = 1.., required = true)]
    pub start_time_text: Vec<String>,

    /// Maximum number of passes over the start times
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Reservation length in minutes, e.g. 90
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub interval_duration: u32,

    /// Press search again between attempts
    #[arg(long)]
    pub refresh_search: bool,

    /// Copy the reservation list to the calendar after booking
    #[arg(long)]
    pub sync_calendar: bool,
}

/// Book a court and print the resulting reservation list
pub async fn run(config: &Config, args: &ReserveArgs) -> BookingResult<()> {
    // Calendar credentials are checked up front so a booking is never made that cannot be synced
    let calendar = if args.sync_calendar {
        let access = CalendarAccess::load()?;
        Some(calendar_client(config, &access)?)
    } else {
        None
    };

    let request = ReservationRequest {
        date: args.reservation_date,
        candidates: args.start_time_text.clone(),
        duration_minutes: args.interval_duration,
        poll: PollSettings {
            max_attempts: args.max_attempts,
            slot_timeout: config.portal.slot_timeout(),
            refresh_search: args.refresh_search,
        },
    };

    let mut portal = open_portal(config).await?;
    let outcome = reserve_then_release(&mut portal, &config.credentials, &request).await?;

    match outcome {
        ReservationOutcome::Booked {
            slot,
            attempt,
            reservations,
        } => {
            info!("Booked {} on attempt {}", slot, attempt);
            println!(
                "Booked {} on {} ({} minutes).",
                slot,
                args.reservation_date.format("%a, %b %d, %Y"),
                args.interval_duration
            );
            print_reservations(&reservations);

            if let Some(calendar) = calendar {
                let report = sync_reservations(&calendar, &reservations, &sync_options(config)).await;
                print_sync_report(&report);
            }
        }
        ReservationOutcome::NoSlotAvailable { attempts } => {
            println!(
                "After {} attempts, none of the start times were found: {}",
                attempts,
                args.start_time_text.join(", ")
            );
        }
    }

    Ok(())
}
