use crate::config::Config;
use crate::finder::ApartmentFinder;
use crate::notify::{LogNotifier, Notifier};
use crate::scraper::{CraigslistScraper, SearchQuery};
use crate::shutdown::Shutdown;
use crate::sink::CsvSink;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod domain;
mod errors;
mod finder;
mod notify;
mod scraper;
mod shutdown;
mod sink;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "apartment_finder")]
#[command(version, about = "Watches Craigslist for new apartments and tells you about them", long_about = None)]
struct Cli {
    /// JSON file with search criteria and notification credentials
    #[arg(short, long, default_value = "config_private.json")]
    config: PathBuf,

    /// Where accepted listings are written (truncated on startup)
    #[arg(short, long, default_value = "apartments.csv")]
    output: PathBuf,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Run the startup fetch and a single poll cycle, then exit
    #[arg(long)]
    once: bool,

    /// Debug-level logging (RUST_LOG wins if set)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "apartment_finder=debug"
    } else {
        "apartment_finder=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Could not load config from {}", cli.config.display()))?;

    let notifier: Box<dyn Notifier> = if cli.dry_run {
        Box::new(LogNotifier)
    } else {
        let transport = config.transport.as_ref().context(
            "No notification credentials: set pushover_API_token/pushover_user_key or \
             from_email/password/to_email, or pass --dry-run",
        )?;
        notify::from_transport(transport)?
    };

    let source = CraigslistScraper::new(SearchQuery::from_config(&config))?;
    let sink = CsvSink::create(&cli.output)?;
    tracing::info!("Writing listings to {}", sink.path().display());
    let shutdown = Shutdown::listen().context("Could not install Ctrl-C handler")?;

    let mut finder = ApartmentFinder::start(config, Box::new(source), notifier, sink)
        .context("Initial fetch failed")?;

    if cli.once {
        let report = finder.run_cycle()?;
        tracing::info!(
            "Single cycle done: {} matching, {} notified",
            report.matched,
            report.notified
        );
        return Ok(());
    }

    finder.run(&shutdown);
    Ok(())
}
