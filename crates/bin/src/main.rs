//! IDX XBRL CLI binary.
//!
//! Runs the report pipeline over a ticker CSV and inspects the stored records.

mod integration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use idx_xbrl::data::xbrl::LineItem;
use idx_xbrl::data::{DownloadConfig, FinancialReport, HttpFetcher, load_ticker_entries};
use idx_xbrl::{DEFAULT_WORKERS, PipelineConfig, ReportProcessor, ShutdownSignal, TickerOutcome};
use indicatif::ProgressBar;
use integration::progress::{ProgressWriter, run_progress_bar};
use integration::store_manager;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "idx-xbrl")]
#[command(about = "IDX XBRL: financial report ETL pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, parse and store every report listed in the input CSV
    Run(RunArgs),

    /// Show stored reports for a ticker
    Show {
        /// Ticker symbol
        ticker: String,

        /// Report database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show report store statistics
    Stats {
        /// Report database path
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input CSV of `ticker,url` rows
    #[arg(long, default_value = "data/reports.csv")]
    csv: PathBuf,

    /// Report database path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Tickers processed concurrently
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Parent directory for per-ticker scratch space
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Per-request download timeout in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Stop starting new tickers after this many seconds
    #[arg(long)]
    run_timeout_secs: Option<u64>,

    /// Retries for transient download failures
    #[arg(long, default_value = "2")]
    retries: u32,

    /// Page visited once to establish a session before downloading
    #[arg(long)]
    warmup_url: Option<Url>,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let show_progress = matches!(&cli.command, Commands::Run(args) if !args.no_progress);
    let pb = run_progress_bar(0, show_progress)?;
    init_tracing(cli.verbose, &pb);

    match cli.command {
        Commands::Run(args) => run_pipeline(args, pb).await,
        Commands::Show { ticker, db, format } => show_reports(&ticker, db.as_deref(), format),
        Commands::Stats { db } => show_stats(db.as_deref()),
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the level for this binary and the pipeline crates.
fn init_tracing(verbose: u8, pb: &ProgressBar) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,idx_xbrl={level},idx_xbrl_data={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ProgressWriter::new(pb.clone()))
        .with_target(verbose > 0)
        .init();
}

fn build_config(args: &RunArgs) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    PipelineConfig {
        workers: args.workers,
        temp_root: args.temp_dir.clone().unwrap_or(defaults.temp_root),
        run_timeout: args.run_timeout_secs.map(Duration::from_secs),
        download: DownloadConfig {
            timeout: Duration::from_secs(args.timeout_secs),
            max_retries: args.retries,
            warmup_url: args.warmup_url.clone(),
            ..DownloadConfig::default()
        },
        extract: defaults.extract,
    }
}

async fn run_pipeline(args: RunArgs, pb: ProgressBar) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_ticker_entries(&args.csv)?;
    if loaded.skipped > 0 {
        warn!(skipped = loaded.skipped, "ignored invalid input rows");
    }
    if loaded.entries.is_empty() {
        pb.finish_and_clear();
        println!("No ticker entries found in {}", args.csv.display());
        return Ok(());
    }

    let config = build_config(&args);
    let store = store_manager::open_store(args.db.as_deref())?;
    info!(
        csv = %args.csv.display(),
        db = %store_manager::store_path(args.db.as_deref()).display(),
        "opened report store"
    );

    let fetcher = HttpFetcher::with_config(config.download.clone());
    let processor = ReportProcessor::new(fetcher, store, config)?;

    let (trigger, shutdown) = ShutdownSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, waiting for in-flight tickers");
            trigger.trigger();
        }
    });

    pb.set_length(loaded.entries.len() as u64);
    let summary = processor
        .process_all_with(loaded.entries, &shutdown, |outcome| {
            pb.inc(1);
            match outcome {
                TickerOutcome::Succeeded(report) => {
                    pb.set_message(format!("{} {}", report.ticker, report.period));
                }
                TickerOutcome::Failed(failure) => {
                    pb.set_message(format!("{} failed", failure.ticker));
                }
            }
        })
        .await?;
    pb.finish_and_clear();

    println!("{}", summary.to_ascii_table());

    if let Some(path) = &args.summary_out {
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        info!(path = %path.display(), "wrote run summary");
    }

    if summary.was_cancelled() {
        println!(
            "Run stopped early: {} tickers were not started",
            summary.skipped.len()
        );
    }

    Ok(())
}

fn show_reports(
    ticker: &str,
    db: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let ticker = ticker.trim().to_uppercase();
    let store = store_manager::open_store(db)?;
    let reports = store.reports_for_ticker(&ticker)?;

    match format {
        OutputFormat::Json => {
            let output = json!({
                "ticker": ticker,
                "reports": reports,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("No reports stored for {}", ticker);
                return Ok(());
            }
            for report in &reports {
                print!("{}", format_report(report));
            }
        }
    }

    Ok(())
}

fn format_report(report: &FinancialReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} {} ({}, ending {}, {})\n",
        report.ticker, report.period.label, report.period.kind, report.period.end, report.currency
    ));
    if let Some(name) = &report.metadata.entity_name {
        output.push_str(&format!("{}\n", name));
    }
    output.push_str(&"=".repeat(64));
    output.push('\n');

    for item in LineItem::ALL {
        let value = item
            .value(&report.items)
            .map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));
        output.push_str(&format!("{:<36} {:>27}\n", item.field_name(), value));
    }

    output.push_str(&"-".repeat(64));
    output.push('\n');
    output.push_str(&format!(
        "Source: {}\nInstance: {} ({} facts, {} unmapped)\nProcessed: {}\n",
        report.metadata.source_url,
        report.metadata.instance_filename,
        report.metadata.fact_count,
        report.metadata.unmapped_fact_count,
        report.metadata.processed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    ));

    output
}

fn show_stats(db: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = store_manager::store_path(db);
    let store = store_manager::open_store(db)?;
    let stats = store.stats()?;

    println!("\nReport Store");
    println!("{}", "=".repeat(40));
    println!("Path:          {}", path.display());
    println!("Reports:       {}", stats.reports);
    println!("Tickers:       {}", stats.tickers);
    println!("Periods:       {}", stats.periods);
    match stats.last_updated {
        Some(at) => println!("Last updated:  {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last updated:  never"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use idx_xbrl::data::{LineItems, PeriodKind, ReportingPeriod, SourceMetadata};

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["idx-xbrl", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.csv, PathBuf::from("data/reports.csv"));
        assert_eq!(args.workers, DEFAULT_WORKERS);
        assert!(args.db.is_none());

        let config = build_config(&args);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.download.timeout, Duration::from_secs(60));
        assert_eq!(config.download.max_retries, 2);
        assert!(config.run_timeout.is_none());
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "idx-xbrl",
            "-vv",
            "run",
            "--csv",
            "tickers.csv",
            "--workers",
            "8",
            "--run-timeout-secs",
            "600",
            "--warmup-url",
            "https://www.idx.co.id/",
            "--no-progress",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.no_progress);

        let config = build_config(&args);
        assert_eq!(config.workers, 8);
        assert_eq!(config.run_timeout, Some(Duration::from_secs(600)));
        assert_eq!(
            config.download.warmup_url.as_ref().map(Url::as_str),
            Some("https://www.idx.co.id/")
        );
    }

    #[test]
    fn test_invalid_warmup_url_rejected() {
        assert!(Cli::try_parse_from(["idx-xbrl", "run", "--warmup-url", "not a url"]).is_err());
    }

    #[test]
    fn test_show_format() {
        let cli = Cli::try_parse_from(["idx-xbrl", "show", "bbca", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Show { ticker, format, .. } => {
                assert_eq!(ticker, "bbca");
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected show command"),
        }
    }

    #[test]
    fn test_format_report() {
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let report = FinancialReport {
            ticker: "BBCA".to_string(),
            period: ReportingPeriod::ending(end, PeriodKind::Annual),
            currency: "IDR".to_string(),
            items: LineItems {
                total_assets: 1_000_000.0,
                net_income: Some(250.5),
                ..LineItems::default()
            },
            metadata: SourceMetadata {
                source_url: "https://www.idx.co.id/BBCA.zip".to_string(),
                instance_filename: "instance.xbrl".to_string(),
                taxonomy_filename: None,
                instance_size_bytes: 10,
                archive_size_bytes: 20,
                entity_name: Some("Bank Central Asia".to_string()),
                entity_code: Some("BBCA".to_string()),
                fact_count: 3,
                unmapped_fact_count: 1,
                processed_at: Utc::now(),
            },
        };

        let text = format_report(&report);
        assert!(text.contains("BBCA 2023-Q4 (annual, ending 2023-12-31, IDR)"));
        assert!(text.contains("Bank Central Asia"));
        assert!(text.contains("1000000.00"));
        assert!(text.contains("250.50"));
        assert!(text.contains("3 facts, 1 unmapped"));
    }
}
