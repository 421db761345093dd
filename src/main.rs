//! Squeeze Scanner - Main Entry Point
//!
//! Response documents go to stdout; logs go to stderr and `logs/`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use squeeze_scanner::api::{handle_scan, PerformanceStats, ScanRequest, ScanResponse};
use squeeze_scanner::config::Config;
use squeeze_scanner::provider::{
    OrtexClient, PaperPriceSource, PriceSource, ShortInterestSource, YahooClient,
};
use squeeze_scanner::scanner::{ScanOrchestrator, ScanResult};
use std::io::Read;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Squeeze Scanner CLI
#[derive(Parser)]
#[command(name = "squeeze-scanner")]
#[command(version, about = "Time-bounded short squeeze risk scanner")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan and print the response document
    Scan {
        /// Restrict the scan to these categories (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        categories: Vec<String>,

        /// Number of symbols requested
        #[arg(short, long)]
        max_tickers: Option<usize>,

        /// Hide results scoring below this in table output
        #[arg(long)]
        min_score: Option<u32>,

        /// Short interest provider credential
        #[arg(long)]
        credential: Option<String>,

        /// Read a JSON request from a file, or `-` for stdin
        #[arg(short, long)]
        request: Option<String>,

        /// Use the paper price source and skip live short interest
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Show calibration, universe sizes, and batch recommendations
    Stats,

    /// List categories and their symbols
    Universe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.json_logs)?;

    let config = Config::load()?;
    config.validate()?;
    log_config(&config);

    match cli.command {
        Commands::Scan {
            categories,
            max_tickers,
            min_score,
            credential,
            request,
            offline,
            format,
        } => {
            let mut request = match request.as_deref() {
                Some(path) => read_request(path)?,
                None => ScanRequest::default(),
            };
            if !categories.is_empty() {
                request.filters.categories = Some(categories);
            }
            if max_tickers.is_some() {
                request.filters.max_tickers = max_tickers;
            }
            if min_score.is_some() {
                request.filters.min_score = min_score;
            }
            if credential.is_some() {
                request.credential = credential;
            }

            let orchestrator = build_orchestrator(&config, offline)?;
            let min_score = request.filters.min_score.unwrap_or(0);
            let response = handle_scan(&orchestrator, request).await;

            match format {
                OutputFormat::Json => print_json(&response)?,
                OutputFormat::Table => print_table(&response, min_score),
            }

            if !response.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Stats => {
            let orchestrator = build_orchestrator(&config, true)?;
            print_json(&PerformanceStats::collect(&orchestrator).await)?;
        }
        Commands::Universe => {
            let orchestrator = build_orchestrator(&config, true)?;
            let universe = orchestrator.universe();
            for name in universe.category_names() {
                let symbols: Vec<&str> = universe
                    .category(name)
                    .unwrap_or_default()
                    .iter()
                    .map(|s| s.as_str())
                    .collect();
                println!("{name} ({}): {}", symbols.len(), symbols.join(", "));
            }
            println!("total: {}", universe.master_list().len());
        }
    }

    Ok(())
}

/// Initialize logging to stderr plus an hourly rolling file.
fn init_logging(json: bool) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "squeeze-scanner.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the flush guard alive for the whole run
    Box::leak(Box::new(guard));

    let filter = EnvFilter::from_default_env()
        .add_directive("squeeze_scanner=debug".parse()?)
        .add_directive(Level::INFO.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

fn log_config(config: &Config) {
    info!(
        price_base_url = %config.providers.price_base_url,
        short_interest_base_url = %config.providers.short_interest_base_url,
        credential_configured = config.short_interest_credential().is_some(),
        "Providers"
    );
    info!(
        timeout_budget_secs = config.scan.timeout_budget_secs,
        price_concurrency = config.scan.price_concurrency,
        price_deadline_secs = config.scan.price_deadline_secs,
        max_safe_batch_size = config.planner.max_safe_batch_size,
        "Scan limits"
    );
}

fn build_orchestrator(config: &Config, offline: bool) -> Result<ScanOrchestrator> {
    if offline {
        info!("Offline mode, using paper prices");
        let prices: Arc<dyn PriceSource> = Arc::new(PaperPriceSource::new());
        return Ok(ScanOrchestrator::new(config, prices, None));
    }

    let prices: Arc<dyn PriceSource> = Arc::new(YahooClient::new(
        &config.providers,
        config.scan.price_call_timeout(),
    )?);
    let short_interest: Arc<dyn ShortInterestSource> = Arc::new(OrtexClient::new(
        &config.providers,
        config.scan.short_interest_timeout(),
    )?);

    Ok(ScanOrchestrator::new(config, prices, Some(short_interest)))
}

fn read_request(path: &str) -> Result<ScanRequest> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read request {path}"))?
    };

    if raw.trim().is_empty() {
        warn!("Empty request body, using defaults");
        return Ok(ScanRequest::default());
    }
    serde_json::from_str(&raw).context("Failed to parse scan request")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize response")?
    );
    Ok(())
}

fn fmt_metric(value: Option<Decimal>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".into())
}

fn table_row(rank: usize, result: &ScanResult) -> String {
    let factors: Vec<String> = result
        .risk_factors
        .iter()
        .filter_map(|f| serde_json::to_value(f).ok())
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    format!(
        "{:>4}  {:<6} {:>5}  {:<22} {:>10} {:>8} {:>6} {:>6} {:>6} {:>6}  {:<9} {}",
        rank,
        result.symbol.as_str(),
        result.total_score,
        result.risk_description,
        format!("{:.2}", result.price.current_price),
        format!("{:+.2}", result.price.change_pct),
        fmt_metric(result.short_metrics.short_interest_pct),
        fmt_metric(result.short_metrics.utilization_pct),
        fmt_metric(result.short_metrics.cost_to_borrow_pct),
        fmt_metric(result.short_metrics.days_to_cover),
        result.data_source,
        factors.join(",")
    )
}

fn print_table(response: &ScanResponse, min_score: u32) {
    let success = match response {
        ScanResponse::Success(success) => success,
        ScanResponse::Failure(failure) => {
            println!("Scan failed: {}", failure.error);
            return;
        }
    };

    println!(
        "{:>4}  {:<6} {:>5}  {:<22} {:>10} {:>8} {:>6} {:>6} {:>6} {:>6}  {:<9} {}",
        "RANK", "SYMBOL", "SCORE", "TIER", "PRICE", "CHG%", "SI%", "UTIL%", "CTB%", "DTC", "SOURCE",
        "FACTORS"
    );

    let shown: Vec<&ScanResult> = success
        .scan_results
        .iter()
        .filter(|r| r.total_score >= min_score)
        .collect();
    for (i, result) in shown.iter().enumerate() {
        println!("{}", table_row(i + 1, result));
    }

    println!();
    println!("{}", success.message);
    if shown.len() < success.scan_results.len() {
        println!(
            "{} results below min score {} hidden",
            success.scan_results.len() - shown.len(),
            min_score
        );
    }
    println!(
        "plan: {} symbols, est {:.1}s, risk {:?}, recommended min score {}",
        success.optimization_info.optimal_size,
        success.optimization_info.estimated_duration,
        success.optimization_info.timeout_risk,
        success.optimization_info.recommended_min_score
    );
}
