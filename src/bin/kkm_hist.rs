use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use kkm::{HistoryScraper, available_acronyms};
use log::{LevelFilter, warn};

/// Prints the purchase history of a KKM student transit card as JSON.
#[derive(Debug, Parser)]
#[command(name = "kkm-hist")]
struct Args {
    /// Student card owner - university acronym. By default UJ.
    #[arg(long, default_value = "UJ")]
    card: String,
    /// Student card ID.
    #[arg(long)]
    id: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();
    let args = Args::parse();
    let scraper = HistoryScraper::new(&args.card, args.id).with_context(|| {
        format!(
            "available university acronyms: {}",
            available_acronyms().join(", ")
        )
    })?;
    let outcome = scraper.scrape().await?;
    for error in &outcome.field_errors {
        warn!("skipped malformed field: {error}");
    }
    println!("{}", serde_json::to_string_pretty(&outcome.tickets)?);
    Ok(())
}
