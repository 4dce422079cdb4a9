//! costlens - month-over-month cloud cost analysis
//!
//! Pulls monthly per-service costs from AWS Cost Explorer, charts the top
//! services, compares the last two months and breaks down the services that
//! grew by cost center and usage type.

mod accumulator;
mod breakdown;
mod bucketing;
mod chart;
mod config;
mod cost_source;
mod diff;
mod display;
mod document;
mod domain;
mod error;
mod export;
mod helpers;
mod models;
mod reports;
mod threshold;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use config::{Config, OutputFormat};
use cost_source::{AwsCostExplorer, CostSource, RecordingCostSource, StaticCostSource};
use display::{display_cost_report, display_cost_report_json, print_error, print_info};
use domain::{GroupingDimension, Period, ReportWindow};
use error::CostLensError;
use export::{
    export_breakdowns_to_csv, export_chart_to_csv, export_services_to_csv, export_totals_to_csv,
};
use reports::{ReportSettings, fetch_breakdown, generate_cost_report};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "costlens")]
#[command(about = "Month-over-month AWS cost analysis with top-N charts and cost breakdowns")]
#[command(version)]
#[command(
    long_about = "costlens pulls monthly UnblendedCost per service from AWS Cost Explorer,
draws a stacked chart of the top services, compares the last two months and
breaks down every service that grew past the thresholds by CostCenter tag and
usage type.

EXAMPLES:
  costlens                             # Report for the last 2 complete months
  costlens --months 3 report           # Three month window
  costlens --json report               # Report as JSON
  costlens breakdown EC2 usage-type    # One breakdown table
  costlens export -o reports           # CSV tables
  costlens --record costs.json report  # Save the fetched data
  costlens --input costs.json report   # Replay saved data without AWS
  costlens config --show               # View current configuration

LOGGING:
  COSTLENS_LOG=debug costlens report   # Show threshold decisions"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        short,
        long,
        help = "Output in JSON format",
        long_help = "Output the report in JSON format instead of tables\nExample: costlens --json | jq '.services[0]'"
    )]
    json: bool,

    #[arg(
        short,
        long,
        value_name = "N",
        help = "Number of complete months in the report",
        long_help = "Length of the reporting window in complete months (default from config: 2)\nThe current, incomplete month is never included"
    )]
    months: Option<u32>,

    #[arg(
        long,
        value_name = "YYYY-MM",
        help = "First month after the window",
        long_help = "Exclusive end of the reporting window (default: current month)\nExample: --until 2024-04 reports on the months before April 2024"
    )]
    until: Option<String>,

    #[arg(long, value_name = "N", help = "Services charted individually")]
    top_n: Option<usize>,

    #[arg(long, value_name = "USD", help = "Minimum increase before a breakdown")]
    abs_threshold: Option<f64>,

    #[arg(long, value_name = "PERCENT", help = "Minimum percentage increase before a breakdown")]
    pct_threshold: Option<f64>,

    #[arg(long, value_name = "REGION", help = "AWS region for Cost Explorer")]
    region: Option<String>,

    #[arg(long, value_name = "PROFILE", help = "AWS profile name")]
    profile: Option<String>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Replay saved cost data instead of calling AWS",
        conflicts_with = "record"
    )]
    input: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Save every fetched response to FILE")]
    record: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Directory for the chart and the document")]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Full cost report (default)")]
    #[command(
        long_about = "Build the full report: stacked chart of the top services, total and\nper-service comparison, and breakdowns for services that grew.\nWrites an SVG chart and a Markdown document to the output directory."
    )]
    Report {
        #[arg(long, help = "Only print tables, write no files")]
        no_files: bool,
    },
    #[command(about = "Break down one service by CostCenter or UsageType")]
    Breakdown {
        #[arg(help = "Service name as Cost Explorer reports it")]
        service: String,
        #[arg(help = "CostCenter or UsageType")]
        dimension: String,
    },
    #[command(about = "Export report tables to CSV")]
    #[command(
        long_about = "Export report tables to CSV files\n\nFILE NAMING:\n  Chart series: {base}.chart.csv\n  Totals: {base}.totals.csv\n  Services: {base}.services.csv\n  Breakdowns: {base}.breakdowns.csv"
    )]
    Export {
        #[arg(
            short,
            long,
            help = "Output file path",
            long_help = "Base path for output files (without extension)\nDefault: <output dir>/costlens_export"
        )]
        output: Option<PathBuf>,
    },
    #[command(about = "Manage configuration")]
    Config {
        #[arg(long, help = "Show current configuration")]
        show: bool,
        #[arg(long, help = "Reset to default configuration")]
        reset: bool,
        #[arg(long, help = "Set default AWS region")]
        set_region: Option<String>,
        #[arg(long, help = "Set default output directory")]
        set_output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        match e.downcast_ref::<CostLensError>() {
            Some(err) => print_error(&err.detailed_message()),
            None => print_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("COSTLENS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Main application logic
async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(Commands::Config {
        show,
        reset,
        set_region,
        set_output_dir,
    }) = &cli.command
    {
        return handle_config_command(
            &mut config,
            *show,
            *reset,
            set_region.clone(),
            set_output_dir.clone(),
        );
    }

    apply_overrides(&mut config, &cli);
    config.validate()?;

    let window = report_window(&config, cli.until.as_deref())?;
    let source: Box<dyn CostSource> = match &cli.input {
        Some(path) => Box::new(
            StaticCostSource::load(path)
                .with_context(|| format!("Failed to load cost data from {}", path.display()))?,
        ),
        None => Box::new(
            AwsCostExplorer::from_env(config.aws_region.as_deref(), config.aws_profile.as_deref())
                .await,
        ),
    };

    match &cli.record {
        Some(record_path) => {
            let recording = RecordingCostSource::new(source);
            let outcome = execute(&cli, &config, window, &recording).await;
            recording
                .recorded()
                .save(record_path)
                .with_context(|| format!("Failed to save cost data to {}", record_path.display()))?;
            print_info(&format!("Cost data saved to {}", record_path.display()));
            outcome
        }
        None => execute(&cli, &config, window, &*source).await,
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(months) = cli.months {
        config.window_months = months;
    }
    if let Some(top_n) = cli.top_n {
        config.top_n = top_n;
    }
    if let Some(abs) = cli.abs_threshold {
        config.abs_threshold = abs;
    }
    if let Some(pct) = cli.pct_threshold {
        config.pct_threshold = pct;
    }
    if cli.region.is_some() {
        config.aws_region = cli.region.clone();
    }
    if cli.profile.is_some() {
        config.aws_profile = cli.profile.clone();
    }
    if cli.output_dir.is_some() {
        config.output_directory = cli.output_dir.clone();
    }
    if cli.json {
        config.default_output_format = OutputFormat::Json;
    }
}

fn report_window(config: &Config, until: Option<&str>) -> Result<ReportWindow> {
    let end: NaiveDate = match until {
        Some(until) => Period::parse(until)?.start(),
        None => Local::now().date_naive(),
    };
    Ok(ReportWindow::ending_before(end, config.window_months)?)
}

async fn execute<S: CostSource + ?Sized>(
    cli: &Cli,
    config: &Config,
    window: ReportWindow,
    source: &S,
) -> Result<()> {
    let settings = ReportSettings::from(config);
    let output_dir = config.get_output_directory();

    match &cli.command {
        None | Some(Commands::Report { no_files: false }) => {
            let report = generate_cost_report(source, window, &settings).await?;
            let chart = chart::write_chart(&report.chart, &output_dir)?;
            let document = document::write_document(&report, Some(&chart), &output_dir)?;
            show_report(config, &report, Some(&chart), Some(&document));
        }
        Some(Commands::Report { no_files: true }) => {
            let report = generate_cost_report(source, window, &settings).await?;
            show_report(config, &report, None, None);
        }
        Some(Commands::Breakdown { service, dimension }) => {
            let dimension: GroupingDimension = dimension.parse()?;
            let records =
                fetch_breakdown(source, window, service, dimension, settings.min_breakdown_cost)
                    .await?;
            match config.default_output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                OutputFormat::Table => {
                    display::display_breakdown(service, dimension, &window.last_two(), &records)
                }
            }
        }
        Some(Commands::Export { output }) => {
            let report = generate_cost_report(source, window, &settings).await?;
            let base = output
                .clone()
                .unwrap_or_else(|| output_dir.join("costlens_export"));
            export_report(&report, &base)?;
        }
        // handled before the source is built
        Some(Commands::Config { .. }) => {}
    }

    Ok(())
}

fn show_report(
    config: &Config,
    report: &models::CostReport,
    chart: Option<&Path>,
    document: Option<&Path>,
) {
    match config.default_output_format {
        OutputFormat::Json => display_cost_report_json(report),
        OutputFormat::Table => display_cost_report(report, chart, document),
    }
}

fn export_report(report: &models::CostReport, base: &Path) -> Result<()> {
    if let Some(parent) = base.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let chart_path = base.with_extension("chart.csv");
    export_chart_to_csv(&report.chart, &chart_path)?;
    print_info(&format!("Chart series exported to {}", chart_path.display()));

    let totals_path = base.with_extension("totals.csv");
    export_totals_to_csv(&report.totals, &totals_path)?;
    print_info(&format!("Totals exported to {}", totals_path.display()));

    let services_path = base.with_extension("services.csv");
    export_services_to_csv(report, &services_path)?;
    print_info(&format!("Services exported to {}", services_path.display()));

    let breakdowns_path = base.with_extension("breakdowns.csv");
    export_breakdowns_to_csv(report, &breakdowns_path)?;
    print_info(&format!("Breakdowns exported to {}", breakdowns_path.display()));

    Ok(())
}

fn handle_config_command(
    config: &mut Config,
    show: bool,
    reset: bool,
    set_region: Option<String>,
    set_output_dir: Option<PathBuf>,
) -> Result<()> {
    if reset {
        *config = Config::default();
        config.save()?;
        print_info("Configuration reset to defaults");
        return Ok(());
    }

    let mut changed = false;
    if let Some(region) = set_region {
        config.aws_region = Some(region);
        changed = true;
    }
    if let Some(dir) = set_output_dir {
        config.output_directory = Some(dir);
        changed = true;
    }
    if changed {
        config.save()?;
        print_info("Configuration updated");
    }

    if show || !changed {
        println!("Configuration file: {}", Config::config_path()?.display());
        print!("{}", serde_yaml::to_string(config)?);
    }

    Ok(())
}
