use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tax_core::{MarginalTaxCalculator, TaxApiError, TaxCalculationRequest, TaxCalculationResult};
use tax_data::{FetcherConfig, TaxService};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tax_cli::config::{self, FileConfig, Overrides};
use tax_cli::output::{
    BracketsReport, BracketsView, CalculationReport, CalculationView, ErrorView, YearsReport,
    YearsView, exit_status, to_json,
};
use tax_cli::utils::parse_decimal;
use tax_cli::{csv_loader, logging};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Marginal income tax calculator.
///
/// Fetches the bracket table for a tax year from the tax API and applies it
/// to an annual income.
#[derive(Debug, Parser)]
#[command(name = "tax-calculator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML file with API and retry settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the tax API (default `http://localhost:5001`).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-attempt timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Retries after the first failed attempt.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Log filter such as `debug` or `tax_data=trace`. Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Print JSON on stdout instead of text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Calculate the tax owed on an annual income.
    Calculate {
        /// Annual income; thousands separators are allowed (`100,000`).
        #[arg(long, value_parser = parse_decimal, allow_hyphen_values = true)]
        income: Decimal,

        #[arg(long)]
        year: i32,

        /// Read brackets from a local CSV file (`min,max,rate`) instead of
        /// the API.
        #[arg(long)]
        brackets_csv: Option<PathBuf>,
    },

    /// Show the bracket table for a tax year.
    Brackets {
        #[arg(long)]
        year: i32,
    },

    /// List the supported tax years.
    Years,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        }
    }
}

// ─── commands ────────────────────────────────────────────────────────────────

/// Cancels the returned token on Ctrl-C so in-flight retries stop promptly.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling request");
            trigger.cancel();
        }
    });
    token
}

fn calculate_offline(
    path: &Path,
    income: Decimal,
) -> anyhow::Result<TaxCalculationResult> {
    let table = csv_loader::load_from_file(path)?;
    let result = MarginalTaxCalculator::new(&table)
        .calculate(income)
        .map_err(TaxApiError::from)?;
    Ok(result)
}

async fn run(
    command: Command,
    config: FetcherConfig,
    json: bool,
) -> anyhow::Result<String> {
    match command {
        Command::Calculate {
            income,
            year,
            brackets_csv,
        } => {
            let result = match brackets_csv {
                Some(path) => calculate_offline(&path, income)?,
                None => {
                    let service = TaxService::http(config)?;
                    let request = TaxCalculationRequest::new(income, year);
                    service
                        .calculate_cancellable(&request, &cancel_on_ctrl_c())
                        .await?
                }
            };

            if json {
                Ok(to_json(&CalculationReport {
                    tax_year: year,
                    annual_income: income,
                    marginal_rate: result.marginal_rate(),
                    result: &result,
                })?)
            } else {
                Ok(CalculationView {
                    tax_year: year,
                    annual_income: income,
                    result: &result,
                }
                .to_string())
            }
        }

        Command::Brackets { year } => {
            let service = TaxService::http(config)?;
            let table = service
                .fetch_brackets_cancellable(year, &cancel_on_ctrl_c())
                .await?;

            if json {
                Ok(to_json(&BracketsReport {
                    tax_year: year,
                    tax_brackets: &table,
                })?)
            } else {
                Ok(BracketsView {
                    tax_year: year,
                    table: &table,
                }
                .to_string())
            }
        }

        Command::Years => {
            let years = &config.supported_years;
            if json {
                Ok(to_json(&YearsReport {
                    supported_years: years,
                })?)
            } else {
                Ok(YearsView(years).to_string())
            }
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref(), cli.log_file.as_deref())?;

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let fetcher_config = config::resolve(file, cli.overrides());
    debug!(
        base_url = %fetcher_config.base_url,
        timeout_ms = fetcher_config.timeout.as_millis() as u64,
        max_retries = fetcher_config.max_retries,
        "resolved configuration"
    );

    let base_url = fetcher_config.base_url.clone();
    match run(cli.command, fetcher_config, cli.json).await {
        Ok(output) => {
            println!("{}", output.trim_end());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let Some(error) = err.downcast_ref::<TaxApiError>() else {
                return Err(err);
            };
            if cli.json {
                let report = to_json(&error.to_report()).context("failed to encode error")?;
                println!("{report}");
            } else {
                eprint!(
                    "{}",
                    ErrorView {
                        error,
                        base_url: &base_url,
                    }
                );
            }
            Ok(ExitCode::from(exit_status(error.kind())))
        }
    }
}
