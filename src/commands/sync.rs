use super::{calendar_client, fetch_then_release, open_portal, print_sync_report, sync_options};
use crate::config::{CalendarAccess, Config, DuplicateCheckPolicy};
use crate::error::BookingResult;
use crate::sync::sync_reservations;
use clap::Args;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Skip an event when the duplicate check fails instead of inserting it
    #[arg(long)]
    pub fail_closed: bool,
}

/// Copy the current reservation list to the calendar
pub async fn run(config: &Config, args: &SyncArgs) -> BookingResult<()> {
    let access = CalendarAccess::load()?;
    let calendar = calendar_client(config, &access)?;

    let mut options = sync_options(config);
    if args.fail_closed {
        options.duplicate_policy = DuplicateCheckPolicy::FailClosed;
    }

    let mut portal = open_portal(config).await?;
    let rows = fetch_then_release(&mut portal, &config.credentials).await?;

    let report = sync_reservations(&calendar, &rows, &options).await;
    print_sync_report(&report);
    Ok(())
}
