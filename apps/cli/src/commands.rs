//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docrelay_core::{RenderRequest, render_index_json, render_llms_index, render_page};
use docrelay_shared::{AppConfig, PackageCoords, SiteConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocRelay — re-render package documentation for automated agents.
#[derive(Parser)]
#[command(
    name = "docrelay",
    version,
    about = "Mirror package documentation pages as enriched, agent-ready Markdown.",
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
    /// Render one documentation page as enriched Markdown.
    Render {
        /// Package name.
        package: String,

        /// Page file (e.g. Relay.Repo.html).
        page: String,

        /// Pin a package version.
        #[arg(short = 'V', long)]
        pkg_version: Option<String>,

        /// Override the upstream base URL.
        #[arg(long)]
        upstream: Option<String>,

        /// Override the wrapper origin used in rewritten links.
        #[arg(long)]
        origin: Option<String>,
    },

    /// Emit a package's index (llms-style Markdown, or JSON with --json).
    Index {
        /// Package name.
        package: String,

        /// Pin a package version.
        #[arg(short = 'V', long)]
        pkg_version: Option<String>,

        /// Emit the structured JSON index instead of Markdown.
        #[arg(long)]
        json: bool,

        /// Override the upstream base URL.
        #[arg(long)]
        upstream: Option<String>,

        /// Override the wrapper origin used in rewritten links.
        #[arg(long)]
        origin: Option<String>,
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
        0 => "docrelay=info",
        1 => "docrelay=debug",
        _ => "docrelay=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
        Command::Render {
            package,
            page,
            pkg_version,
            upstream,
            origin,
        } => {
            cmd_render(
                &package,
                &page,
                pkg_version,
                upstream.as_deref(),
                origin.as_deref(),
            )
            .await
        }
        Command::Index {
            package,
            pkg_version,
            json,
            upstream,
            origin,
        } => {
            cmd_index(
                &package,
                pkg_version,
                json,
                upstream.as_deref(),
                origin.as_deref(),
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Resolve the site config from disk plus CLI overrides.
fn resolve_site(upstream: Option<&str>, origin: Option<&str>) -> Result<SiteConfig> {
    let mut config = load_config()?;
    if let Some(upstream) = upstream {
        config.upstream.base_url = upstream.to_string();
    }
    if let Some(origin) = origin {
        config.wrapper.origin = origin.to_string();
    }
    Ok(SiteConfig::from_app_config(&config)?)
}

async fn cmd_render(
    package: &str,
    page: &str,
    pkg_version: Option<String>,
    upstream: Option<&str>,
    origin: Option<&str>,
) -> Result<()> {
    let site = resolve_site(upstream, origin)?;
    let request = RenderRequest {
        coords: PackageCoords::new(package, pkg_version)?,
        page: page.to_string(),
    };

    info!(package, page, upstream = %site.upstream_base, "rendering page");

    let spinner = working_spinner(&format!("Rendering {package}/{page}"));
    let document = render_page(&site, &request).await;
    spinner.finish_and_clear();

    if document.status != 200 {
        info!(status = document.status, "render degraded to error document");
    }
    println!("{}", document.body);
    Ok(())
}

async fn cmd_index(
    package: &str,
    pkg_version: Option<String>,
    json: bool,
    upstream: Option<&str>,
    origin: Option<&str>,
) -> Result<()> {
    let site = resolve_site(upstream, origin)?;
    let coords = PackageCoords::new(package, pkg_version)?;

    info!(package, json, upstream = %site.upstream_base, "building package index");

    let spinner = working_spinner(&format!("Indexing {package}"));
    let document = if json {
        render_index_json(&site, &coords).await
    } else {
        render_llms_index(&site, &coords).await
    };
    spinner.finish_and_clear();

    println!("{}", document.body);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Spinner
// ---------------------------------------------------------------------------

/// A steady spinner shown while retrievals are in flight.
fn working_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}
