use clap::Parser;
use courtbot::commands::{self, Cli};
use courtbot::startup;
use tracing::{error, info};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    startup::init_logging()?;

    info!("Starting courtbot");

    // Credentials are required before any remote interaction
    let config = startup::load_config()?;

    commands::run(cli.command, &config).await.map_err(|e| {
        error!("Run failed: {}", e);
        e.into()
    })
}
