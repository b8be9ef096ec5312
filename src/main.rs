use anyhow::{bail, Context, Result};
use clap::Parser;
use econscraper::{output, FetchStrategy, Month, Registry, Scraper, ScraperConfig};
use std::{env, io, path::PathBuf, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fetch monthly economic indicators and merge them into one table"
)]
struct Args {
    /// Indicator names, as printed by --list.
    indicators: Vec<String>,
    /// First month to keep, as YYYY/MM. Overrides ECON_START_MONTH.
    #[arg(long)]
    start: Option<String>,
    /// Indicators fetched at once. Overrides ECON_CONCURRENCY.
    #[arg(long)]
    concurrency: Option<usize>,
    /// YAML catalog to use instead of the built-in one.
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Output file (.parquet or CSV). CSV goes to stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Print the catalog and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
    });
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) registry ─────────────────────────────────────────────────
    let registry = match &args.registry {
        Some(path) => Registry::from_yaml_path(path)
            .with_context(|| format!("loading registry {}", path.display()))?,
        None => Registry::builtin(),
    };

    if args.list {
        for indicator in &registry.indicators {
            let kind = match &indicator.strategy {
                FetchStrategy::Table(t) => format!("table\t{}", t.url),
                FetchStrategy::Query(q) => format!("query\t{} ({:?})", q.code, q.periodicity),
            };
            println!("{}\t{}", indicator.name, kind);
        }
        return Ok(());
    }
    if args.indicators.is_empty() {
        bail!("no indicators given; run with --list to see the catalog");
    }

    // ─── 3) config ───────────────────────────────────────────────────
    let mut config = ScraperConfig::from_env()?;
    if let Some(start) = &args.start {
        let month: Month = start
            .parse()
            .with_context(|| format!("--start {:?}", start))?;
        config = config.with_start_month(month);
    }
    if let Some(n) = args.concurrency {
        config = config.with_concurrency(n);
    }
    info!(start = %config.start_month, concurrency = config.concurrency, "startup");

    // ─── 4) fetch & merge ────────────────────────────────────────────
    let scraper = Scraper::new(registry, config)?;
    let started = Instant::now();
    let table = match args.indicators.as_slice() {
        [one] => scraper.fetch_one(one).await?,
        many => scraper.fetch_many(many).await?,
    };
    info!(
        rows = table.len(),
        columns = table.columns().len(),
        elapsed = ?started.elapsed(),
        "fetched"
    );

    // ─── 5) write ────────────────────────────────────────────────────
    match &args.out {
        Some(path) => output::write_to_path(&table, path)
            .with_context(|| format!("writing {}", path.display()))?,
        None => output::write_csv(&table, io::stdout().lock())?,
    }

    Ok(())
}
