//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use docketwatch_core::{RunOptions, RunProgress, RunReport, run_digest};
use docketwatch_digest::{DeliverySink, FileSink, SmtpSink};
use docketwatch_enrich::Enricher;
use docketwatch_ledger::Ledger;
use docketwatch_shared::{AppConfig, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docketwatch — court decision feed monitor.
#[derive(Parser)]
#[command(
    name = "docketwatch",
    version,
    about = "Monitor the court's decision feed and deliver a deduplicated daily digest.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the feed and deliver a digest of new decisions.
    Run {
        /// Only consider decisions issued within this many days.
        #[arg(long)]
        window_days: Option<i64>,

        /// Render to a file instead of sending email; commit nothing.
        #[arg(long)]
        dry_run: bool,

        /// Output path for the dry-run digest.
        #[arg(long, default_value = "digest.html")]
        output: PathBuf,
    },

    /// Inspect the delivered-cases ledger.
    Ledger {
        /// Ledger subcommand.
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Ledger subcommands.
#[derive(Subcommand)]
pub(crate) enum LedgerAction {
    /// List the most recently delivered cases.
    List {
        /// Maximum number of cases to show.
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Check whether a case has already been delivered.
    Check {
        /// Docket identifier, e.g. 24-1145.
        case_id: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docketwatch=info",
        1 => "docketwatch=debug",
        _ => "docketwatch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            window_days,
            dry_run,
            output,
        } => cmd_run(window_days, dry_run, &output).await,
        Command::Ledger { action } => match action {
            LedgerAction::List { limit } => cmd_ledger_list(limit).await,
            LedgerAction::Check { case_id } => cmd_ledger_check(&case_id).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(window_days: Option<i64>, dry_run: bool, output: &PathBuf) -> Result<()> {
    let config = load_config()?;

    let db_path = config.ledger.resolved_db_path()?;
    let ledger = Ledger::open(&db_path).await?;

    let enricher = Enricher::from_config(&config.enrichment)?.map(Arc::new);

    let sink: Box<dyn DeliverySink> = if dry_run {
        Box::new(FileSink::new(output))
    } else {
        Box::new(SmtpSink::from_config(&config.delivery)?)
    };

    let options = RunOptions {
        window_days: window_days.unwrap_or(config.feed.window_days),
        commit: !dry_run,
    };

    info!(
        feed = %config.feed.url,
        window_days = options.window_days,
        dry_run,
        "starting digest run"
    );

    let reporter = CliProgress::new();
    let report = run_digest(
        &config,
        &options,
        &ledger,
        enricher,
        sink.as_ref(),
        &reporter,
    )
    .await?;

    println!();
    println!("  Digest run complete!");
    println!("  Feed entries: {}", report.entries_seen);
    println!("  In window:    {}", report.in_window);
    println!("  New:          {}", report.new_records);
    if report.enrichment.cache_hits + report.enrichment.cache_misses > 0 {
        println!(
            "  Summarized:   {} ({} from cache)",
            report.enrichment.enriched + report.enrichment.cache_hits,
            report.enrichment.cache_hits
        );
    }
    println!("  Delivered:    {}", report.delivered);
    if dry_run {
        println!("  Output:       {}", output.display());
        println!("  Committed:    no (dry run)");
    } else {
        println!("  Committed:    {}", if report.committed { "yes" } else { "no" });
    }
    println!("  Time:         {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl RunProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_enriched(&self, current: usize, total: usize, case_id: &str) {
        self.spinner
            .set_message(format!("Summarizing [{current}/{total}] {case_id}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// ledger
// ---------------------------------------------------------------------------

async fn cmd_ledger_list(limit: u32) -> Result<()> {
    let config = load_config()?;
    let ledger = Ledger::open(&config.ledger.resolved_db_path()?).await?;

    let entries = ledger.list_recent(limit).await?;
    if entries.is_empty() {
        println!("Ledger is empty.");
        return Ok(());
    }

    for entry in entries {
        let marker = if entry.precedential { "P" } else { " " };
        println!(
            "{}  {:>8}  [{marker}]  {}",
            entry.delivered_at, entry.case_id, entry.title
        );
    }

    Ok(())
}

async fn cmd_ledger_check(case_id: &str) -> Result<()> {
    let config = load_config()?;
    let ledger = Ledger::open(&config.ledger.resolved_db_path()?).await?;

    if ledger.contains(case_id).await? {
        println!("{case_id}: delivered");
    } else {
        println!("{case_id}: not delivered");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
