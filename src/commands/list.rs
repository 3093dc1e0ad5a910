use super::{fetch_then_release, open_portal, print_reservations};
use crate::config::Config;
use crate::error::BookingResult;

/// Print the current reservation list
pub async fn run(config: &Config) -> BookingResult<()> {
    let mut portal = open_portal(config).await?;
    let rows = fetch_then_release(&mut portal, &config.credentials).await?;

    print_reservations(&rows);
    Ok(())
}
