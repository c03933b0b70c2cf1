use clap::Parser;
use kkm::{DetailScraper, LoadFromEnv, TransportConfig};
use log::LevelFilter;

/// Prints the contact details registered for a KKM card as JSON.
#[derive(Debug, Parser)]
#[command(name = "kkm-detail")]
struct Args {
    /// Student card ID suffixed with two-digit university code.
    #[arg(long)]
    id: u32,
    /// KKM card ID.
    #[arg(long)]
    kkm: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();
    let args = Args::parse();
    let scraper = DetailScraper::new(args.id, args.kkm)?;
    let config = TransportConfig::load_from_env()?;
    let detail = scraper.scrape(&config).await?;
    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}
