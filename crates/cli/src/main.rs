// Tally CLI - reconcile sales sheets into the sales store

mod exit_codes;
mod recon;
mod store;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use recon::{ResolveArgs, RunArgs};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Reconcile retail sales sheets into the sales store")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, aggregate and upsert a sales workbook
    #[command(after_help = "\
Exit code 6 means at least one batch was refused; re-running is safe because \
every write is an upsert on (date, store_id, product_id, order_type).

Examples:
  tally run innslegnar.toml sales.xlsx
  tally run innslegnar.toml sales.xlsx --dry-run --catalog catalog.json --json
  tally run innslegnar.toml kronan.csv --sheet-label Krónan --strict
  tally run innslegnar.toml sales.xlsx --from 2026-02-01 --to 2026-02-09
  TALLY_STORE_URL=https://x.supabase.co TALLY_STORE_KEY=... tally run cfg.toml sales.xlsx")]
    Run(RunArgs),

    /// Validate a run config without reading any input
    #[command(after_help = "\
Examples:
  tally validate innslegnar.toml")]
    Validate {
        /// Path to the run config (.toml)
        config: std::path::PathBuf,
    },

    /// Show how names resolve against a catalog snapshot
    #[command(after_help = "\
Without --chain the names are treated as product names; with --chain they are
store headers on that sheet.

Examples:
  tally resolve innslegnar.toml --catalog catalog.json Peach 'Lemon Lime'
  tally resolve innslegnar.toml --catalog catalog.json --chain Samkaup Nettó-Borgarnes")]
    Resolve(ResolveArgs),

    /// Save store credentials to the config directory
    #[command(after_help = "\
Examples:
  tally login --url https://x.supabase.co --key $SERVICE_KEY
  tally login --url https://x.supabase.co --key $SERVICE_KEY --no-verify")]
    Login {
        /// Store project URL
        #[arg(long, env = "TALLY_STORE_URL")]
        url: String,

        /// Store service key
        #[arg(long, env = "TALLY_STORE_KEY", hide_env_values = true)]
        key: String,

        /// Save without checking the credentials against the store
        #[arg(long)]
        no_verify: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ")",
        "\nengine:  tally-recon ",
        env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => Err(CliError {
            code: EXIT_USAGE,
            message: "Usage: tally <command> [options]".into(),
            hint: Some("tally --help for more information".into()),
        }),
        Some(Commands::Run(args)) => recon::cmd_run(args),
        Some(Commands::Validate { config }) => recon::cmd_validate(config),
        Some(Commands::Resolve(args)) => recon::cmd_resolve(args),
        Some(Commands::Login { url, key, no_verify }) => store::cmd_login(url, key, no_verify),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
