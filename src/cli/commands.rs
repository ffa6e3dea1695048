//! CLI parser and command dispatch.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::DatabaseSettings;
use crate::pipeline::{Driver, DriverConfig};
use crate::repository::DbContext;
use crate::scrapers::{CatalogParser, HttpClient, CATALOGUE_BASE, FIRST_PAGE};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Perpetual catalogue harvester")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    harvest: HarvestArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest the catalogue forever, restarting after each traversal (default)
    Run,

    /// Harvest the catalogue once and exit
    Once,

    /// Create the catalogue table and exit
    Init,
}

#[derive(Args)]
struct HarvestArgs {
    /// First listing page of every traversal
    #[arg(long, global = true, env = "HARVEST_START_URL", default_value = FIRST_PAGE)]
    start_url: String,

    /// Base URL that relative item and next-page links resolve against
    #[arg(long, global = true, env = "HARVEST_BASE_URL", default_value = CATALOGUE_BASE)]
    base_url: String,

    /// Seconds to sleep between traversals and before retrying a failed page
    #[arg(long, global = true, env = "HARVEST_INTERVAL_SECS", default_value = "15")]
    interval: u64,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, env = "HARVEST_TIMEOUT_SECS", default_value = "30")]
    timeout: u64,

    /// Override the browser User-Agent
    #[arg(long, global = true, env = "HARVEST_USER_AGENT")]
    user_agent: Option<String>,

    /// Pause after every HTTP request, in milliseconds
    #[arg(long, global = true, default_value = "0")]
    request_delay_ms: u64,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => cmd_run(cli.harvest, false).await,
        Some(Commands::Once) => cmd_run(cli.harvest, true).await,
        Some(Commands::Init) => cmd_init().await,
    }
}

async fn open_database() -> anyhow::Result<DbContext> {
    let settings = DatabaseSettings::from_env()?;
    let ctx = DbContext::from_url(&settings.url)?;
    info!(
        backend = ctx.pool().backend_name(),
        url = %settings.display_url(),
        "opened database"
    );
    ctx.init_schema().await?;
    Ok(ctx)
}

async fn cmd_init() -> anyhow::Result<()> {
    open_database().await?;
    println!("Catalogue table ready");
    Ok(())
}

async fn cmd_run(args: HarvestArgs, once: bool) -> anyhow::Result<()> {
    let ctx = open_database().await?;

    let fetcher = HttpClient::with_user_agent(
        Duration::from_secs(args.timeout),
        Duration::from_millis(args.request_delay_ms),
        args.user_agent.as_deref(),
    )?;
    let parser = CatalogParser::new(&args.base_url)?;
    let config = DriverConfig {
        start_url: args.start_url,
        interval: Duration::from_secs(args.interval),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
        }
        // Keep the sender alive so the driver never sees a closed channel
        std::future::pending::<()>().await;
    });

    let catalog = ctx.catalog();
    let mut driver =
        Driver::new(fetcher, catalog.clone(), parser, config).with_shutdown(shutdown_rx);

    if once {
        if let Some(stats) = driver.run_once().await {
            println!(
                "Harvested {} pages: {} new records, {} already stored ({} total)",
                stats.pages,
                stats.inserted,
                stats.duplicates,
                catalog.count().await?
            );
        }
    } else {
        driver.run().await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_runs_forever() {
        let cli = Cli::try_parse_from(["harvest"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_once_with_overrides() {
        let cli = Cli::try_parse_from([
            "harvest",
            "once",
            "-v",
            "--interval",
            "2",
            "--start-url",
            "http://localhost:8080/catalogue/page-1.html",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Once)));
        assert_eq!(cli.harvest.interval, 2);
        assert_eq!(
            cli.harvest.start_url,
            "http://localhost:8080/catalogue/page-1.html"
        );
    }

    #[test]
    fn test_rejects_non_numeric_interval() {
        assert!(Cli::try_parse_from(["harvest", "run", "--interval", "soon"]).is_err());
    }
}
