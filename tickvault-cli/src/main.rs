//! TickVault CLI — download, update, fetch, status, and usage commands.
//!
//! Commands:
//! - `download` — save the full history of one or more series
//! - `update` — extend already-stored series to the present
//! - `fetch` — resolve a date bracket against a stored series and print rows
//! - `status` — report the series catalog
//! - `usage` — report per-credential API token usage

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tickvault_core::auth::KeyRotator;
use tickvault_core::domain::{Interval, SeriesKey, TableKey};
use tickvault_core::ingest::{download_many, update_history};
use tickvault_core::provider::TwelveDataClient;
use tickvault_core::store::{fetch_by_dates, BracketRequest, SeriesStore};
use tickvault_core::AppConfig;

#[derive(Parser)]
#[command(
    name = "tickvault",
    about = "TickVault CLI — market-data backfill and bracket lookups"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "tickvault.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the full history of one or more series.
    Download {
        /// Symbols to download (e.g., NVDA AAPL USD/EUR).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Sampling interval: 1min or 1day.
        #[arg(long, default_value = "1min")]
        interval: String,

        /// Market identifier code for equities. Defaults to the primary
        /// listing venue.
        #[arg(long)]
        mic: Option<String>,

        /// Restrict rotation to these credential names.
        #[arg(long)]
        keys: Vec<String>,
    },
    /// Extend already-stored series up to the present.
    Update {
        /// Symbols to update.
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Sampling interval: 1min or 1day.
        #[arg(long, default_value = "1min")]
        interval: String,

        /// Market identifier code for equities.
        #[arg(long)]
        mic: Option<String>,

        /// Restrict rotation to these credential names.
        #[arg(long)]
        keys: Vec<String>,
    },
    /// Resolve a date bracket against a stored series and print the rows.
    Fetch {
        /// Symbol of the stored series.
        symbol: String,

        /// Sampling interval: 1min or 1day.
        #[arg(long, default_value = "1min")]
        interval: String,

        /// Market identifier code for equities.
        #[arg(long)]
        mic: Option<String>,

        /// Bracket start (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS").
        #[arg(long)]
        start: Option<String>,

        /// Bracket end (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS").
        #[arg(long)]
        end: Option<String>,

        /// Bracket span in days, as an alternative to the second date.
        #[arg(long)]
        days: Option<i64>,

        /// Bracket span in rows, as an alternative to the second date.
        #[arg(long)]
        rows: Option<i64>,
    },
    /// Report the series catalog.
    Status,
    /// Report per-credential API token usage.
    Usage,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    match cli.command {
        Commands::Download {
            symbols,
            interval,
            mic,
            keys,
        } => run_download(&config, &symbols, &interval, mic.as_deref(), &keys),
        Commands::Update {
            symbols,
            interval,
            mic,
            keys,
        } => run_update(&config, &symbols, &interval, mic.as_deref(), &keys),
        Commands::Fetch {
            symbol,
            interval,
            mic,
            start,
            end,
            days,
            rows,
        } => run_fetch(
            &config,
            &symbol,
            &interval,
            mic.as_deref(),
            start.as_deref(),
            end.as_deref(),
            days,
            rows,
        ),
        Commands::Status => run_status(&config),
        Commands::Usage => run_usage(&config),
    }
}

fn open_store(config: &AppConfig) -> Result<SeriesStore> {
    SeriesStore::open(&config.database.path)
        .with_context(|| format!("opening database {}", config.database.path.display()))
}

fn table_keys(symbols: &[String], interval: &str, mic: Option<&str>) -> Result<Vec<TableKey>> {
    let interval: Interval = interval.parse()?;
    symbols
        .iter()
        .map(|symbol| {
            let key = SeriesKey::parse(symbol, mic)?;
            Ok(TableKey::new(key, interval))
        })
        .collect()
}

fn rotation(config: &AppConfig, keys: &[String]) -> Result<KeyRotator> {
    let pool = config.credential_pool()?;
    let restriction = if keys.is_empty() { None } else { Some(keys) };
    Ok(KeyRotator::new(&pool, restriction)?)
}

fn run_download(
    config: &AppConfig,
    symbols: &[String],
    interval: &str,
    mic: Option<&str>,
    keys: &[String],
) -> Result<()> {
    let tables = table_keys(symbols, interval, mic)?;
    let mut store = open_store(config)?;
    let mut rotator = rotation(config, keys)?;
    let client = TwelveDataClient::new();

    let summary = download_many(&mut store, &client, &mut rotator, &tables);
    println!(
        "Download complete: {}/{} succeeded, {} rows stored",
        summary.succeeded, summary.total, summary.rows
    );
    if !summary.all_succeeded() {
        for (table, err) in &summary.errors {
            eprintln!("Error for {table}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_update(
    config: &AppConfig,
    symbols: &[String],
    interval: &str,
    mic: Option<&str>,
    keys: &[String],
) -> Result<()> {
    let tables = table_keys(symbols, interval, mic)?;
    let mut store = open_store(config)?;
    let mut rotator = rotation(config, keys)?;
    let client = TwelveDataClient::new();

    for table in &tables {
        let appended = update_history(&mut store, &client, &mut rotator, table)
            .with_context(|| format!("updating {table}"))?;
        println!("{table}: +{appended} rows");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_fetch(
    config: &AppConfig,
    symbol: &str,
    interval: &str,
    mic: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    days: Option<i64>,
    rows: Option<i64>,
) -> Result<()> {
    let interval: Interval = interval.parse()?;
    let table = TableKey::new(SeriesKey::parse(symbol, mic)?, interval);
    let store = open_store(config)?;

    let request = BracketRequest {
        start_date: start.map(parse_cli_date).transpose()?,
        end_date: end.map(parse_cli_date).transpose()?,
        time_span: days.map(chrono::Duration::days),
        row_span: rows,
    };
    let fetched = fetch_by_dates(&store, &table, &request)?;
    if fetched.is_empty() {
        println!("No rows in the requested bracket for {table}.");
        return Ok(());
    }

    println!(
        "{:>6} {:<20} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "ID", "Timestamp", "Open", "High", "Low", "Close", "Volume"
    );
    for row in &fetched {
        let point = &row.point;
        println!(
            "{:>6} {:<20} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>12}",
            row.row_id,
            interval.format_timestamp(point.timestamp),
            point.open,
            point.high,
            point.low,
            point.close,
            point
                .volume
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
        );
    }
    println!("{} rows.", fetched.len());
    Ok(())
}

fn run_status(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let entries = store.catalog()?;
    if entries.is_empty() {
        println!("No stored series in {}.", config.database.path.display());
        return Ok(());
    }

    println!(
        "{:<24} {:<10} {:<8} {:<20} {:<20} {:>10}",
        "Table", "Symbol", "Interval", "First", "Last", "Rows"
    );
    println!("{}", "-".repeat(98));
    for entry in &entries {
        let render = |ts: Option<chrono::NaiveDateTime>| {
            ts.map_or_else(|| "-".to_string(), |t| entry.interval.format_timestamp(t))
        };
        println!(
            "{:<24} {:<10} {:<8} {:<20} {:<20} {:>10}",
            entry.table_name,
            entry.symbol,
            entry.interval.as_str(),
            render(entry.first_ts),
            render(entry.last_ts),
            entry.row_count,
        );
    }
    Ok(())
}

fn run_usage(config: &AppConfig) -> Result<()> {
    let pool = config.credential_pool()?;
    let client = TwelveDataClient::new();
    for credential in pool.iter() {
        match client.api_usage(credential) {
            Ok(report) => println!(
                "{credential}: {}/{} tokens used",
                report.current_usage, report.plan_limit
            ),
            Err(err) => eprintln!("{credential}: usage unavailable ({err})"),
        }
    }
    Ok(())
}

/// Accept both day and second precision on the command line.
fn parse_cli_date(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }
    bail!("unrecognized date '{raw}' (expected YYYY-MM-DD or \"YYYY-MM-DD HH:MM:SS\")")
}
