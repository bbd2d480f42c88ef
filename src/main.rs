//! # ruleforge
//!
//! **ruleforge** keeps AI agent rule files (such as `.cursor/rules.md`) in
//! sync with a shared base repository on GitHub.
//!
//! Features:
//! - `ruleforge download` fetches the configured files into the local tree
//! - `ruleforge upload -m <message>` pushes local files to a branch of the
//!   base repository and opens a pull request
//!
//! Settings come from `.ruleforge.yaml` and can be overridden with flags.
//! This CLI is built with [clap](https://docs.rs/clap).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ruleforge::{
    DEFAULT_CONFIG_FILE, Overrides, cmd_download, cmd_upload, init_logging, resolve_config,
    spawn_update_check,
};

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "ruleforge",
    version,
    about = "ruleforge - share AI agent rules through a base repository",
    arg_required_else_help = true
)]
struct Cli {
    /// Path of the config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Base repository (URL or owner/repo)
    #[arg(short, long, global = true)]
    base_repo: Option<String>,

    /// Files to sync, comma separated
    #[arg(short, long, global = true, value_delimiter = ',')]
    files: Option<Vec<String>>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Download agent rules from the base repository
    Download,
    /// Send local agent rules to the base repository as a pull request
    Upload {
        /// Commit message and pull request title
        #[arg(short, long)]
        message: String,
    },
}

fn run(cli: Cli) -> Result<()> {
    let Some(cmd) = cli.cmd else {
        return Ok(());
    };

    let message = match &cmd {
        Cmd::Upload { message } => Some(message.clone()),
        Cmd::Download => None,
    };
    let logging = init_logging(cli.verbose);
    let cfg = resolve_config(
        &cli.config,
        Overrides {
            base_repo: cli.base_repo,
            files: cli.files,
            message,
            verbose: cli.verbose,
        },
    )?;
    if cfg.verbose {
        logging.set_verbose(true);
    }

    match cmd {
        Cmd::Download => cmd_download(&cfg),
        Cmd::Upload { .. } => cmd_upload(&cfg),
    }
}

/// CLI entry point.
///
/// Parses arguments, starts the background update check, and executes the
/// selected subcommand. The update check never changes the exit code.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let notifier = spawn_update_check();
    let result = run(cli);

    if let Some(msg) = notifier.and_then(|n| n.try_message()) {
        eprintln!("{}", msg);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
