//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use oobswap_core::{Reconciler, SwapResult, SwapScheduler};
use oobswap_document::Document;
use oobswap_shared::{
    AppConfig, SwapConfig, format_interval, init_config, load_config, load_config_from,
    parse_interval, render_config,
};
use serde::Serialize;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// oobswap: apply out-of-band swaps from a response to a page.
#[derive(Parser)]
#[command(
    name = "oobswap",
    version,
    about = "Reconcile the out-of-band fragments of an HTML response into a page.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.oobswap/oobswap.toml.
    #[arg(long, env = "OOBSWAP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Output format of `reconcile`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Html,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Apply a response's OOB nodes to a page and print the result.
    Reconcile {
        /// Page the swaps are applied to.
        #[arg(long)]
        page: PathBuf,

        /// Response body carrying the OOB nodes.
        #[arg(long)]
        response: PathBuf,

        /// Default settle delay (e.g. 20ms, 1s); overrides the config file.
        #[arg(long, env = "OOBSWAP_SETTLE")]
        settle: Option<String>,

        /// Output format: html or json.
        #[arg(long, default_value = "html")]
        format: OutputFormat,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
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
        0 => "oobswap=info",
        1 => "oobswap=debug",
        _ => "oobswap=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // logs go to stderr so stdout stays parseable
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Reconcile {
            page,
            response,
            settle,
            format,
        } => {
            let config = load_app_config(cli.config.as_deref())?;
            cmd_reconcile(config, &page, &response, settle.as_deref(), format).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()).await,
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Apply a `--settle` override on top of the loaded `[swap]` section.
fn swap_config(config: AppConfig, settle: Option<&str>) -> Result<SwapConfig> {
    let mut swap = config.swap;
    if let Some(settle) = settle {
        swap.default_settle_delay = parse_interval(settle).ok_or_else(|| {
            eyre!("invalid --settle duration '{settle}': expected e.g. 20ms or 1s")
        })?;
    }
    Ok(swap)
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Everything a reconcile run reports.
#[derive(Debug, Serialize)]
pub(crate) struct ReconcileReport {
    /// Response content left after the OOB nodes were taken out.
    pub primary: String,
    pub swaps: Vec<SwapResult>,
    /// The page after every swap and settle step has run.
    pub page: String,
    pub errors: Vec<String>,
}

async fn cmd_reconcile(
    config: AppConfig,
    page: &Path,
    response: &Path,
    settle: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let swap = swap_config(config, settle)?;
    let page_html = std::fs::read_to_string(page)
        .wrap_err_with(|| format!("cannot read page '{}'", page.display()))?;
    let response_html = std::fs::read_to_string(response)
        .wrap_err_with(|| format!("cannot read response '{}'", response.display()))?;

    let report = reconcile_markup(swap, &page_html, &response_html).await;

    match format {
        OutputFormat::Html => print!("{}", render_html(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.errors.is_empty() {
        return Err(eyre!(
            "{} OOB directive(s) failed: {}",
            report.errors.len(),
            report.errors.join("; ")
        ));
    }
    Ok(())
}

/// Reconcile `response` into `page`, wait for every deferred swap and settle
/// step, and collect the outcome.
pub(crate) async fn reconcile_markup(
    swap: SwapConfig,
    page: &str,
    response: &str,
) -> ReconcileReport {
    let default_settle = swap.default_settle_delay;
    let reconciler = Reconciler::with_scheduler(swap, SwapScheduler::local());
    let doc = Document::parse(page).into_handle();

    let outcome = reconciler.reconcile(response, &doc, default_settle);
    let swaps = match &outcome {
        Ok(reconciliation) => &reconciliation.swaps,
        Err(failure) => &failure.partial.swaps,
    };
    if let Some(longest) = swaps.iter().map(|s| s.timing.total()).max() {
        debug!(longest = %format_interval(longest), "waiting for deferred swaps to settle");
    }
    reconciler.scheduler().settled().await;

    let (reconciliation, errors) = match outcome {
        Ok(reconciliation) => (reconciliation, Vec::new()),
        Err(failure) => {
            let errors = failure.errors.iter().map(ToString::to_string).collect();
            (failure.partial, errors)
        }
    };
    info!(swaps = reconciliation.swaps.len(), "page reconciled");

    let page = doc.borrow().to_html();
    ReconcileReport {
        primary: reconciliation.primary.to_html(),
        swaps: reconciliation.swaps,
        page,
        errors,
    }
}

fn render_html(report: &ReconcileReport) -> String {
    let mut out = String::new();
    out.push_str("<!-- primary -->\n");
    out.push_str(&report.primary);
    out.push('\n');

    out.push_str(&format!("<!-- swaps: {} -->\n", report.swaps.len()));
    for swap in &report.swaps {
        out.push_str(&format!(
            "<!-- {} {} swap:{} settle:{} -->\n",
            swap.label,
            swap.strategy,
            format_interval(swap.timing.swap_delay),
            format_interval(swap.timing.settle_delay),
        ));
    }
    for error in &report.errors {
        out.push_str(&format!("<!-- error: {error} -->\n"));
    }

    out.push_str("<!-- page -->\n");
    out.push_str(&report.page);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_app_config(path)?;
    println!("{}", render_config(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../fixtures/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn parses_reconcile_command() {
        let cli = Cli::try_parse_from([
            "oobswap",
            "-vv",
            "reconcile",
            "--page",
            "page.html",
            "--response",
            "resp.html",
            "--format",
            "json",
            "--settle",
            "5ms",
        ])
        .expect("valid args");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Reconcile {
                page,
                settle,
                format,
                ..
            } => {
                assert_eq!(page, PathBuf::from("page.html"));
                assert_eq!(settle.as_deref(), Some("5ms"));
                assert_eq!(format, OutputFormat::Json);
            }
            Command::Config { .. } => panic!("expected reconcile"),
        }
    }

    #[test]
    fn settle_flag_overrides_config() {
        let swap = swap_config(AppConfig::default(), Some("1s")).unwrap();
        assert_eq!(swap.default_settle_delay, Duration::from_secs(1));

        let swap = swap_config(AppConfig::default(), None).unwrap();
        assert_eq!(swap.default_settle_delay, Duration::from_millis(20));

        assert!(swap_config(AppConfig::default(), Some("soon")).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_waits_for_deferred_work() {
        let report = reconcile_markup(
            SwapConfig::default(),
            &load_fixture("html/todos.html"),
            &load_fixture("responses/delayed.html"),
        )
        .await;

        assert!(report.errors.is_empty());
        assert_eq!(report.swaps.len(), 2);
        assert!(report.page.contains(r#"<span id="count">3 items</span>"#));
        assert!(report.page.contains(r#"<footer id="flash" class="notice">Undo?</footer>"#));
        assert!(!report.page.contains("htmx-"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["swaps"][0]["target"], "span#count");
        assert_eq!(json["swaps"][0]["strategy"], "innerHTML");
        assert_eq!(json["swaps"][0]["timing"]["swap_delay"], 50);
        assert_eq!(json["swaps"][0]["timing"]["deferred"], true);
    }

    #[tokio::test]
    async fn failures_are_reported_with_partial_page() {
        let report = reconcile_markup(
            SwapConfig::default(),
            &load_fixture("html/todos.html"),
            &load_fixture("responses/bad-selector.html"),
        )
        .await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("ul.alerts["));
        assert!(report.page.contains(r#"<span id="count">3 items</span>"#));

        let html = render_html(&report);
        assert!(html.starts_with("<!-- primary -->\n"));
        assert!(html.contains("<!-- swaps: 1 -->"));
        assert!(html.contains("<!-- span#count outerHTML swap:0ms settle:20ms -->"));
        assert!(html.contains("<!-- error: invalid OOB target selector `ul.alerts[`"));
    }
}
