//! CLI entry point for the star audit tool.
//!
//! Provides subcommands for fetching star history and download counts,
//! aggregating raw stars into a daily CSV, running the baseline/spike
//! anomaly analysis, and rendering charts.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, CommandFactory, Parser, Subcommand};
use star_audit::analyzers::analyzer::{AnalysisPlan, analyze, generate_report};
use star_audit::analyzers::zscore::calculate_z_scores;
use star_audit::config::{Config, DateRange, Overrides};
use star_audit::fetch::auth::{ApiKey, get_github_token};
use star_audit::fetch::{BasicClient, HttpClient};
use star_audit::infra::{GitHubClient, PypiStatsClient};
use star_audit::output::{
    ensure_dir, print_summary, write_daily_csv, write_daily_csv_to, write_json, write_zscore_csv,
    zscore_csv_path,
};
use star_audit::parser::parse_star_events;
use star_audit::plot::{
    AnalysisChart, comparison_ratios, create_analysis_plot, create_comparison_plot,
    downloads_per_star,
};
use star_audit::series::{aggregate_stars_by_date, load_star_data};
use star_audit::services::{DownloadSource, DownloadStats, RepoMetadata, StarSource};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "star_audit")]
#[command(about = "Fetch GitHub star history and test star spikes for anomalies", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Repository owner (default: $STAR_AUDIT_OWNER or stanfordnlp)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Repository name (default: $STAR_AUDIT_REPO or dspy)
    #[arg(long, global = true)]
    repo: Option<String>,

    /// PyPI package name (default: $STAR_AUDIT_PYPI_PACKAGE or dspy-ai)
    #[arg(long, global = true)]
    pypi_package: Option<String>,

    /// Directory for generated files
    #[arg(short = 'd', long, global = true)]
    output_dir: Option<PathBuf>,

    /// Baseline period as START..END (inclusive, YYYY-MM-DD)
    #[arg(long, global = true)]
    baseline: Option<DateRange>,

    /// Spike period as START..END (inclusive, YYYY-MM-DD)
    #[arg(long, global = true)]
    spike: Option<DateRange>,

    /// Outlier threshold in standard deviations
    #[arg(long, global = true)]
    threshold: Option<f64>,
}

impl From<GlobalArgs> for Overrides {
    fn from(args: GlobalArgs) -> Self {
        Overrides {
            owner: args.owner,
            repo: args.repo,
            pypi_package: args.pypi_package,
            output_dir: args.output_dir,
            baseline: args.baseline,
            spike: args.spike,
            threshold: args.threshold,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch stargazers, repository metadata and PyPI download counts
    Fetch,
    /// Aggregate a raw stargazer JSON file into a daily CSV on stdout
    Aggregate {
        /// Raw stargazer JSON (default: <repo>_stars_raw.json in the output directory)
        #[arg(value_name = "RAW_JSON")]
        raw: Option<PathBuf>,
    },
    /// Run the baseline/spike anomaly analysis on a daily CSV
    Analyze {
        /// Daily star CSV (date,new_stars[,total_stars] or date,stars)
        #[arg(value_name = "STARS_DAILY_CSV")]
        csv: Option<PathBuf>,
    },
    /// Render the analysis and downloads-per-star charts
    Visualize {
        /// Daily star CSV, ideally the *_with_zscores.csv from `analyze`
        #[arg(value_name = "STARS_DAILY_WITH_ZSCORES_CSV")]
        csv: Option<PathBuf>,

        /// Repository metadata JSON written by `fetch`
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// PyPI download JSON written by `fetch`
        #[arg(long)]
        downloads: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/star_audit.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("star_audit.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_overrides(cli.global.into())?;

    match cli.command {
        Commands::Fetch => fetch(&config).await?,
        Commands::Aggregate { raw } => {
            let raw = raw.unwrap_or_else(|| config.raw_stars_path());
            aggregate(&raw)?;
        }
        Commands::Analyze { csv } => {
            let Some(csv) = csv else { usage_exit("analyze") };
            run_analysis(&config, &csv)?;
        }
        Commands::Visualize {
            csv,
            metadata,
            downloads,
        } => {
            let Some(csv) = csv else { usage_exit("visualize") };
            visualize(&config, &csv, metadata.as_deref(), downloads.as_deref())?;
        }
    }

    Ok(())
}

/// Prints the subcommand's usage line and exits with status 1.
fn usage_exit(subcommand: &str) -> ! {
    eprintln!("{}", usage(subcommand));
    std::process::exit(1);
}

fn usage(subcommand: &str) -> String {
    let mut cmd = Cli::command();
    cmd.build();
    cmd.find_subcommand_mut(subcommand)
        .map(|sub| sub.render_usage().to_string())
        .unwrap_or_default()
}

/// Fetches repository metadata, the full stargazer history and PyPI
/// download counts, writing each to the output directory.
#[tracing::instrument(skip_all, fields(owner = %config.owner, repo = %config.repo))]
async fn fetch(config: &Config) -> Result<()> {
    ensure_dir(&config.output_dir)?;

    let http: Box<dyn HttpClient> = match get_github_token().await {
        Some(token) => {
            info!("Using authenticated requests");
            Box::new(ApiKey::github_token(BasicClient::new()?, &token)?)
        }
        None => {
            warn!("No GitHub token found. Rate limits will be strict.");
            Box::new(BasicClient::new()?)
        }
    };
    let github = GitHubClient::new(http, &config.github_api_url, &config.owner, &config.repo);

    let metadata = github.fetch_repo_metadata().await?;
    if let Some(m) = &metadata {
        info!(
            repository = %m.name,
            stars = m.stars,
            forks = m.forks,
            created = %m.created_at,
            "Repository metadata fetched"
        );
    }

    info!("Fetching star history from GitHub API");
    let stars = github.fetch_stargazers().await?;
    if stars.is_empty() {
        warn!("No stargazers fetched");
    } else {
        info!(total = stars.len(), "Total stars fetched");
        let daily = aggregate_stars_by_date(&stars);

        write_json(config.raw_stars_path(), &stars)?;
        write_json(config.daily_json_path(), &daily)?;
        write_daily_csv(config.daily_csv_path(), &daily)?;
        info!(
            raw = %config.raw_stars_path().display(),
            daily_csv = %config.daily_csv_path().display(),
            days = daily.len(),
            "Saved star data"
        );
    }

    info!("Fetching PyPI download statistics");
    let pypi = PypiStatsClient::new(
        BasicClient::new()?,
        &config.pypistats_api_url,
        &config.pypi_package,
    );
    let downloads = pypi.fetch_downloads().await?;
    write_json(config.downloads_path(), &downloads)?;
    info!(path = %config.downloads_path().display(), "Saved PyPI download data");

    if let Some(mut m) = metadata {
        m.fetch_timestamp = Some(Utc::now());
        write_json(config.metadata_path(), &m)?;
        info!(path = %config.metadata_path().display(), "Saved metadata");
    }

    info!("Data collection complete");
    Ok(())
}

/// Reads a raw stargazer JSON file and prints the daily CSV to stdout.
fn aggregate(raw: &Path) -> Result<()> {
    let bytes = std::fs::read(raw).with_context(|| format!("reading {}", raw.display()))?;
    let events = parse_star_events(&bytes)?;
    let daily = aggregate_stars_by_date(&events);
    write_daily_csv_to(std::io::stdout().lock(), &daily)?;
    Ok(())
}

/// Runs the detector over a daily CSV, writing the JSON report and the
/// z-score CSV.
#[tracing::instrument(skip(config), fields(csv = %csv.display()))]
fn run_analysis(config: &Config, csv: &Path) -> Result<()> {
    info!("Loading data");
    let series = load_star_data(csv)?;
    let analysis = analyze(series, &AnalysisPlan::from(config))?;

    ensure_dir(&config.output_dir)?;
    let report = generate_report(&analysis, Utc::now());
    write_json(config.report_path(), &report)?;
    info!(path = %config.report_path().display(), "Full report saved");

    print_summary(&analysis);

    let output_csv = zscore_csv_path(csv);
    write_zscore_csv(&output_csv, &analysis.series)?;
    info!(path = %output_csv.display(), "Enhanced data saved");
    Ok(())
}

/// Renders the analysis chart and the downloads-per-star comparison.
#[tracing::instrument(skip(config, metadata, downloads), fields(csv = %csv.display()))]
fn visualize(
    config: &Config,
    csv: &Path,
    metadata: Option<&Path>,
    downloads: Option<&Path>,
) -> Result<()> {
    info!("Loading data");
    let mut series = load_star_data(csv)?;
    let plan = AnalysisPlan::from(config);

    if series.iter().all(|d| d.z_score.is_none()) {
        info!("Input has no z_score column, scoring against the baseline");
        calculate_z_scores(&mut series, &plan.baseline)?;
    }

    ensure_dir(&config.output_dir)?;

    let chart = AnalysisChart {
        project: &config.repo,
        plan,
        events: &config.events,
    };
    create_analysis_plot(&series, &chart, config.analysis_chart_path())?;

    let measured = match (metadata, downloads) {
        (Some(metadata), Some(downloads)) => {
            let metadata: RepoMetadata = read_json(metadata)?;
            let downloads: DownloadStats = read_json(downloads)?;
            let ratio = downloads_per_star(&metadata, &downloads);
            if ratio.is_none() {
                warn!("Could not compute downloads per star from the supplied files");
            }
            ratio
        }
        _ => None,
    };
    let ratios = comparison_ratios(&config.repo, measured);
    create_comparison_plot(&ratios, &config.repo, config.comparison_chart_path())?;

    info!("All visualizations created successfully");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}
