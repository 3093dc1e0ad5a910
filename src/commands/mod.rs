use crate::components::google_calendar::GoogleCalendarClient;
use crate::components::portal::{BookingPortal, WebDriverPortal};
use crate::config::{CalendarAccess, Config, PortalCredentials};
use crate::error::BookingResult;
use crate::models::ReservationRow;
use crate::reservation::{fetch_reservations, make_reservation, ReservationOutcome, ReservationRequest};
use crate::shutdown::run_until_shutdown;
use crate::sync::{SyncOptions, SyncReport};
use clap::{Parser, Subcommand};
use tracing::warn;

// Export submodules
pub mod list;
pub mod reserve;
pub mod sync;

/// Book tennis courts on the club portal and mirror reservations to Google Calendar
#[derive(Debug, Parser)]
#[command(name = "courtbot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll for a free slot and book it
    Reserve(reserve::ReserveArgs),
    /// Copy current reservations to the calendar, skipping ones already there
    Sync(sync::SyncArgs),
    /// Print current reservations
    List,
}

/// Dispatch a parsed command
pub async fn run(command: Command, config: &Config) -> BookingResult<()> {
    match command {
        Command::Reserve(args) => reserve::run(config, &args).await,
        Command::Sync(args) => sync::run(config, &args).await,
        Command::List => list::run(config).await,
    }
}

/// Close the browser session, logging instead of failing so the run's own result is what gets reported
pub async fn release_portal<P: BookingPortal + ?Sized>(portal: &mut P) {
    if let Err(e) = portal.close().await {
        warn!("Failed to close browser session: {}", e);
    }
}

/// Book a court, then release the browser session whether or not the run succeeded
pub async fn reserve_then_release<P>(
    portal: &mut P,
    credentials: &PortalCredentials,
    request: &ReservationRequest,
) -> BookingResult<ReservationOutcome>
where
    P: BookingPortal + ?Sized,
{
    let result = run_until_shutdown(make_reservation(&mut *portal, credentials, request)).await;
    release_portal(portal).await;
    result
}

/// Read the reservation list, then release the browser session whether or not the read succeeded
pub async fn fetch_then_release<P>(
    portal: &mut P,
    credentials: &PortalCredentials,
) -> BookingResult<Vec<ReservationRow>>
where
    P: BookingPortal + ?Sized,
{
    let result = run_until_shutdown(fetch_reservations(&mut *portal, credentials)).await;
    release_portal(portal).await;
    result
}

/// Open the browser session
pub async fn open_portal(config: &Config) -> BookingResult<WebDriverPortal> {
    WebDriverPortal::connect(&config.portal).await
}

/// Build the calendar client for the configured calendar
pub fn calendar_client(config: &Config, access: &CalendarAccess) -> BookingResult<GoogleCalendarClient> {
    GoogleCalendarClient::from_config(access, &config.calendar)
}

/// Sync options derived from the configuration
pub fn sync_options(config: &Config) -> SyncOptions {
    SyncOptions {
        timezone: config.timezone,
        location: config.calendar.location.clone(),
        duplicate_policy: config.calendar.duplicate_policy,
    }
}

/// Print reservations as a table on stdout
pub fn print_reservations(rows: &[ReservationRow]) {
    if rows.is_empty() {
        println!("No reservations.");
        return;
    }

    println!("{:<20} {:<22} {}", "Date", "Time", "Activity");
    for row in rows {
        println!("{}", row.format());
    }
}

/// Print a sync summary on stdout
pub fn print_sync_report(report: &SyncReport) {
    println!(
        "Synced {} reservations: {} inserted, {} already on calendar, {} failed",
        report.processed(),
        report.inserted,
        report.duplicates,
        report.failed.len()
    );
    for failure in &report.failed {
        println!(
            "  row {} ({} {}): {}",
            failure.index + 1,
            failure.row.date,
            failure.row.time_range,
            failure.reason
        );
    }
}
