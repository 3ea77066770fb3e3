//! TickerLens CLI — fetch a watch list and print aligned price tables.
//!
//! Commands:
//! - `fetch` — load a watch list from Yahoo Finance (or synthetic data),
//!   print the normalized table, optionally write raw/normalized CSV
//! - `config init` — print or write the default watch-list TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tickerlens_core::data::{
    table_csv, CancelToken, CircuitBreaker, DataProvider, LoadOutcome, PriceField, PriceTable,
    SymbolSet, SyntheticProvider, TimeSeriesLoader, TracingProgress, YahooProvider,
};
use tickerlens_core::{DashboardConfig, LoaderConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tickerlens",
    about = "TickerLens CLI — load, align and normalize daily closing prices"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a watch list and print the normalized price table.
    Fetch {
        /// Watch-list TOML file. Mutually exclusive with positional symbols.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbols as NAME=TICKER (e.g. Apple=AAPL). A bare TICKER uses the ticker as name.
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to three years before the end.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Attempts per symbol, first one included.
        #[arg(long)]
        max_retries: Option<u32>,

        /// Fixed wait between attempts, in milliseconds.
        #[arg(long)]
        retry_delay_ms: Option<u64>,

        /// Price field to read: close or adj_close.
        #[arg(long, value_parser = parse_price_field)]
        price_field: Option<PriceField>,

        /// Use seeded synthetic data instead of Yahoo Finance.
        #[arg(long)]
        synthetic: Option<u64>,

        /// Fetch symbols concurrently.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Give up on the whole batch after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Directory to write raw.csv and normalized.csv into.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Watch-list config commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default watch list as TOML, or write it to a file.
    Init {
        /// Output path. Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Loader overrides taken from the command line.
struct LoaderOverrides {
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    price_field: Option<PriceField>,
}

impl LoaderOverrides {
    fn apply(&self, mut config: LoaderConfig) -> Result<LoaderConfig> {
        if let Some(n) = self.max_retries {
            config.max_retries = n;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry_delay_ms = ms;
        }
        if let Some(field) = self.price_field {
            config.price_field = field;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tickerlens=info,tickerlens_core=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            config,
            symbols,
            start,
            end,
            max_retries,
            retry_delay_ms,
            price_field,
            synthetic,
            parallel,
            timeout_secs,
            csv,
        } => {
            let overrides = LoaderOverrides {
                max_retries,
                retry_delay_ms,
                price_field,
            };
            run_fetch(FetchArgs {
                config,
                symbols,
                start,
                end,
                overrides,
                synthetic,
                parallel,
                timeout_secs,
                csv,
            })
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { output, force } => run_config_init(output.as_deref(), force),
        },
    }
}

struct FetchArgs {
    config: Option<PathBuf>,
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    overrides: LoaderOverrides,
    synthetic: Option<u64>,
    parallel: bool,
    timeout_secs: Option<u64>,
    csv: Option<PathBuf>,
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    if args.config.is_some() && !args.symbols.is_empty() {
        bail!("--config and positional symbols are mutually exclusive");
    }

    let mut dashboard = match &args.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None if args.symbols.is_empty() => DashboardConfig::default_watchlist(),
        None => {
            let mut config = DashboardConfig::default_watchlist();
            config.symbols = parse_symbols(&args.symbols)?.iter().cloned().collect();
            config
        }
    };

    if let Some(start) = args.start.as_deref() {
        dashboard.start = Some(parse_date(start)?);
    }
    if let Some(end) = args.end.as_deref() {
        dashboard.end = Some(parse_date(end)?);
    }
    dashboard.loader = args.overrides.apply(dashboard.loader)?;

    let today = chrono::Local::now().date_naive();
    let request = dashboard.request(today)?;

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider: Arc<dyn DataProvider> = match args.synthetic {
        Some(seed) => Arc::new(SyntheticProvider::new(seed)),
        None => Arc::new(YahooProvider::new(Arc::clone(&circuit_breaker))?),
    };

    let loader = TimeSeriesLoader::new(provider, dashboard.loader.clone())
        .with_progress(Arc::new(TracingProgress))
        .with_configured_cache();

    let cancel = match args.timeout_secs {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };

    let outcome = if args.parallel {
        loader.load_parallel(&request, &cancel)
    } else {
        loader.load_with_cancel(&request, &cancel)
    };

    report_failures(&outcome);
    let cooldown = circuit_breaker.remaining_cooldown();
    if !cooldown.is_zero() {
        eprintln!(
            "Yahoo Finance is refusing requests; retry in {} min",
            cooldown.as_secs().div_ceil(60)
        );
    }
    if outcome.successes.is_empty() {
        bail!("no data available for any requested symbol");
    }

    let alignment = outcome.align();
    for name in &alignment.unnormalized {
        eprintln!("Warning: {name} has no usable prices and was left out of the normalized table");
    }

    print_summary(&loader, &outcome, &alignment.raw);
    println!();
    print_table(&alignment.normalized);

    if let Some(dir) = args.csv {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        write_csv(&dir.join("raw.csv"), &alignment.raw)?;
        write_csv(&dir.join("normalized.csv"), &alignment.normalized)?;
        println!("CSV written to: {}", dir.display());
    }

    Ok(())
}

fn run_config_init(output: Option<&Path>, force: bool) -> Result<()> {
    let toml_str = DashboardConfig::default_watchlist().to_toml()?;

    match output {
        None => print!("{toml_str}"),
        Some(path) => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            std::fs::write(path, toml_str)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote default watch list to {}", path.display());
        }
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn parse_price_field(s: &str) -> Result<PriceField, String> {
    match s {
        "close" => Ok(PriceField::Close),
        "adj_close" | "adjclose" => Ok(PriceField::AdjClose),
        _ => Err(format!("unknown price field '{s}'. Valid: close, adj_close")),
    }
}

fn parse_symbols(args: &[String]) -> Result<SymbolSet> {
    let pairs = args.iter().map(|arg| match arg.split_once('=') {
        Some((name, ticker)) => (name.trim().to_string(), ticker.trim().to_string()),
        None => (arg.clone(), arg.clone()),
    });
    for (name, ticker) in pairs.clone() {
        if name.is_empty() || ticker.is_empty() {
            bail!("invalid symbol '{name}={ticker}': expected NAME=TICKER");
        }
    }
    Ok(SymbolSet::from_pairs(pairs)?)
}

fn report_failures(outcome: &LoadOutcome) {
    if outcome.cancelled {
        eprintln!("Load was cancelled before every symbol was attempted");
    }
    for name in &outcome.failures {
        eprintln!("No data for {name}");
    }
}

fn print_summary(loader: &TimeSeriesLoader, outcome: &LoadOutcome, raw: &PriceTable) {
    let first = raw.dates().first();
    let last = raw.dates().last();
    println!("=== Price Series ===");
    println!("Source:   {}", loader.provider_name());
    println!(
        "Loaded:   {} of {}",
        outcome.successes.len(),
        outcome.successes.len() + outcome.failures.len()
    );
    println!("Field:    {}", loader.config().price_field);
    if let (Some(first), Some(last)) = (first, last) {
        println!("Range:    {first} to {last} ({} dates)", raw.height());
    }
    println!("Dataset:  {}", &outcome.dataset_hash()[..16]);
}

fn print_table(table: &PriceTable) {
    let names: Vec<&str> = table.names().collect();
    let mut header = format!("{:<12}", "Date");
    for name in &names {
        header.push_str(&format!(" {:>18}", truncate(name, 18)));
    }
    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    for (date, cells) in table.rows() {
        let mut line = format!("{:<12}", date.to_string());
        for cell in cells {
            match cell {
                Some(v) => line.push_str(&format!(" {v:>18.2}")),
                None => line.push_str(&format!(" {:>18}", "-")),
            }
        }
        println!("{line}");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).chain(std::iter::once('…')).collect()
    }
}

fn write_csv(path: &Path, table: &PriceTable) -> Result<()> {
    let content = table_csv(table)?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
