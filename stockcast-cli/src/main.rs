//! Stockcast CLI: ingest, show, forecast and store status commands.
//!
//! Commands:
//! - `ingest`: fetch daily bars (Alpha Vantage or saved payloads) and sync new rows
//! - `show`: print stored bars with moving averages and signal
//! - `forecast`: train on stored bars and print a dated multi-step forecast
//! - `status`: row counts and date ranges per stored symbol

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockcast_core::config::{AppConfig, ModelKind};
use stockcast_core::data::{
    AlphaVantageSource, BarStore, CircuitBreaker, JsonFileSource, Normalizer, ParquetStore,
    PriceSource,
};
use stockcast_core::pipeline::{
    forecast_symbol, ingest_symbols, normalize_symbol, ForecastReport, StdoutProgress,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockcast",
    about = "Stockcast CLI: daily bar ingestion and recursive price forecasting"
)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store directory (overrides config and STOCKCAST_STORE_DIR).
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence when set).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily bars and append the ones not yet stored.
    Ingest {
        /// Symbols to ingest (e.g., IBM AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Read saved payloads `{DIR}/{SYMBOL}.json` instead of calling the API.
        #[arg(long)]
        from_dir: Option<PathBuf>,
    },
    /// Print stored bars for a symbol.
    Show {
        symbol: String,

        /// Number of most recent bars to print.
        #[arg(long, default_value_t = 20)]
        tail: usize,
    },
    /// Train on stored bars and forecast the next business days.
    Forecast {
        symbol: String,

        /// Number of future closes (defaults to config, 10).
        #[arg(long)]
        horizon: Option<usize>,

        /// Regressor: boosted or linear (defaults to config).
        #[arg(long)]
        model: Option<ModelKind>,

        /// Also write the forecast to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Report row counts and date ranges for every stored symbol.
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.store_dir {
        config.store.dir = dir;
    }
    debug!(?config, "configuration loaded");

    let store = ParquetStore::new(&config.store.dir);

    match cli.command {
        Commands::Ingest { symbols, from_dir } => run_ingest(&config, &store, &symbols, from_dir),
        Commands::Show { symbol, tail } => run_show(&store, &symbol, tail),
        Commands::Forecast {
            symbol,
            horizon,
            model,
            csv,
        } => {
            if let Some(h) = horizon {
                config.forecast.horizon = h;
            }
            if let Some(m) = model {
                config.forecast.model = m;
            }
            config.validate()?;
            run_forecast(&config, &store, &symbol, csv.as_deref())
        }
        Commands::Status => run_status(&store),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_ingest(
    config: &AppConfig,
    store: &ParquetStore,
    symbols: &[String],
    from_dir: Option<PathBuf>,
) -> Result<()> {
    let circuit_breaker = Arc::new(CircuitBreaker::from_config(&config.source));
    let source: Box<dyn PriceSource> = match from_dir {
        Some(dir) => Box::new(JsonFileSource::new(dir)),
        None => {
            if config.source.api_key.is_empty() {
                bail!("no API key: set STOCKCAST_API_KEY or [source].api_key, or use --from-dir");
            }
            Box::new(AlphaVantageSource::new(
                config.source.clone(),
                Arc::clone(&circuit_breaker),
            )?)
        }
    };

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let summary = ingest_symbols(
        source.as_ref(),
        store,
        &Normalizer::new(),
        &sym_refs,
        &StdoutProgress,
    );

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        let cooldown = circuit_breaker.remaining_cooldown();
        if !cooldown.is_zero() {
            eprintln!("Provider throttled; retry in {}s", cooldown.as_secs().max(1));
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_show(store: &ParquetStore, symbol: &str, tail: usize) -> Result<()> {
    let symbol = normalize_symbol(symbol)?;
    let series = store.load(&symbol)?;
    if series.is_empty() {
        println!("No stored bars for {symbol} in {}", store.dir().display());
        return Ok(());
    }

    let fmt_opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{x:.2}"));

    println!("{symbol}: {} bars", series.len());
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>14} {:>10} {:>10} {:>6}",
        "Date", "Open", "High", "Low", "Close", "Volume", "MA10", "MA50", "Signal"
    );
    println!("{}", "-".repeat(102));
    let skip = series.len().saturating_sub(tail);
    for bar in series.iter().skip(skip) {
        println!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14.0} {:>10} {:>10} {:>6}",
            bar.date.to_string(),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            fmt_opt(bar.ma10),
            fmt_opt(bar.ma50),
            bar.signal.as_str(),
        );
    }
    Ok(())
}

fn run_forecast(config: &AppConfig, store: &ParquetStore, symbol: &str, csv_path: Option<&Path>) -> Result<()> {
    let report = forecast_symbol(store, symbol, &config.forecast)?;
    print_forecast(&report);

    if let Some(path) = csv_path {
        write_forecast_csv(&report, path)?;
        println!("Forecast saved to: {}", path.display());
    }
    Ok(())
}

fn print_forecast(report: &ForecastReport) {
    println!("{} forecast ({} model)", report.symbol, report.model);
    println!(
        "Trained on {} rows, held out {}",
        report.training.train_rows, report.training.test_rows
    );
    if let Some(m) = &report.training.holdout {
        println!("Held-out RMSE: {:.4}  MAE: {:.4}", m.rmse, m.mae);
    }
    println!("Last stored bar: {}", report.last_date);
    println!();
    println!("{:<12} {:>12}", "Date", "Close");
    println!("{}", "-".repeat(25));
    for point in &report.points {
        println!("{:<12} {:>12.2}", point.date.to_string(), point.close);
    }
}

fn write_forecast_csv(report: &ForecastReport, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    wtr.write_record(["symbol", "date", "predicted_close"])?;
    for point in &report.points {
        let date = point.date.format("%Y-%m-%d").to_string();
        let close = format!("{:.4}", point.close);
        wtr.write_record([report.symbol.as_str(), date.as_str(), close.as_str()])?;
    }
    wtr.flush().context("failed to flush CSV writer")?;
    Ok(())
}

fn run_status(store: &ParquetStore) -> Result<()> {
    if !store.dir().exists() {
        println!("Store directory does not exist: {}", store.dir().display());
        return Ok(());
    }

    let rows = store.status()?;
    if rows.is_empty() {
        println!("Store is empty: {}", store.dir().display());
        return Ok(());
    }

    let fmt_date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());

    println!("Store: {}", store.dir().display());
    println!("Symbols: {}", rows.len());
    println!();
    println!("{:<8} {:<12} {:<12} {:>8}", "Symbol", "First", "Last", "Bars");
    println!("{}", "-".repeat(43));
    for row in &rows {
        println!(
            "{:<8} {:<12} {:<12} {:>8}",
            row.symbol,
            fmt_date(row.start_date),
            fmt_date(row.end_date),
            row.row_count
        );
    }
    Ok(())
}
