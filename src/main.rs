use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_onboarder::cli::Output;
use catalog_onboarder::cli::commands::{config, onboard, state};
use catalog_onboarder::config::{ConfigLoader, OnboardingMode};
use catalog_onboarder::state::RepoStatus;

/// Parse onboarding mode from string
fn parse_mode(s: &str) -> Result<OnboardingMode, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "catalog-onboarder")]
#[command(
    version,
    about = "Onboard source repositories into a developer-portal catalog"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Config file (default: .onboarder/config.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover repositories and onboard them into the catalog
    Onboard {
        #[arg(long, help = "Organization or user to onboard")]
        org: Option<String>,
        #[arg(long, value_parser = parse_mode, help = "Mode: yaml (pull request), api (create entity), register (import manifest)")]
        mode: Option<OnboardingMode>,
        #[arg(long, help = "Concurrent workers")]
        concurrency: Option<usize>,
        #[arg(long = "rate-limit-ms", help = "Delay before each dispatch in milliseconds")]
        rate_limit_ms: Option<u64>,
        #[arg(long = "dry-run", help = "List selected repositories without onboarding")]
        dry_run: bool,
        #[arg(long, help = "Only these repositories (name or glob, repeatable)")]
        include: Vec<String>,
        #[arg(long, help = "Skip these repositories (name or glob, repeatable)")]
        exclude: Vec<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Inspect and maintain the processing ledger
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusFilter {
    Success,
    Error,
    InProgress,
}

impl From<StatusFilter> for RepoStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Success => RepoStatus::Success,
            StatusFilter::Error => RepoStatus::Error,
            StatusFilter::InProgress => RepoStatus::InProgress,
        }
    }
}

#[derive(Subcommand)]
enum StateAction {
    /// Show ledger counters
    Stats {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// List ledger entries
    List {
        #[arg(long, value_enum, help = "Only entries with this status")]
        status: Option<StatusFilter>,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// Forget one repository so the next run processes it
    Reset {
        #[arg(help = "Repository as owner/name")]
        repo: String,
    },
    /// Forget every repository
    ResetAll,
    /// Drop entries older than the given age
    Cleanup {
        #[arg(long = "older-than-days", default_value = "30")]
        older_than_days: i64,
    },
    /// Write the ledger to a file
    Export { path: PathBuf },
    /// Replace the ledger with a previously exported file
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Organization written into the project config")]
        org: Option<String>,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mcatalog-onboarder encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Level used when RUST_LOG is unset: flags first, then the configured level
fn default_log_level(cli: &Cli) -> String {
    if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map(|c| c.runtime.log_level)
            .unwrap_or_else(|_| "info".to_string())
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&default_log_level(&cli));

    let out = Output::new(cli.quiet);
    let config_path: Option<&Path> = cli.config.as_deref();

    match cli.command {
        Commands::Onboard {
            org,
            mode,
            concurrency,
            rate_limit_ms,
            dry_run,
            include,
            exclude,
            format,
        } => {
            let options = onboard::OnboardOptions {
                organization: org,
                mode,
                concurrency,
                rate_limit_ms,
                dry_run,
                include,
                exclude,
                json: format == "json",
            };
            let rt = Runtime::new()?;
            let clean = rt.block_on(onboard::run(config_path, options, out))?;
            if !clean {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::State { action } => {
            let store = state::open_store(config_path)?;
            match action {
                StateAction::Stats { format } => state::stats(&store, format == "json", out)?,
                StateAction::List { status, format } => {
                    state::list(&store, status.map(RepoStatus::from), format == "json", out)?
                }
                StateAction::Reset { repo } => state::reset(&store, &repo, out)?,
                StateAction::ResetAll => state::reset_all(&store, out)?,
                StateAction::Cleanup { older_than_days } => {
                    state::cleanup(&store, older_than_days, out)?
                }
                StateAction::Export { path } => state::export(&store, &path, out)?,
                StateAction::Import { path } => state::import(&store, &path, out)?,
            }
            store.close()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => config::show(config_path, &format)?,
            ConfigAction::Path => config::path(config_path)?,
            ConfigAction::Init { global, org, force } => {
                config::init(global, org.as_deref(), force, out)?
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
