//! Camwatch CLI - camwatch command

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use cli_lib::settings::{self, Overrides};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod cmd;

/// Camwatch - run hook scripts when a video device is opened or closed
#[derive(Parser)]
#[command(name = "camwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Hook scripts to run on every transition, after configured scripts
    scripts: Vec<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/camwatch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Device directory to watch (overrides the config file)
    #[arg(long, global = true)]
    device_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the process table once and report device state
    Scan,
    /// Show configuration
    #[command(group(ArgGroup::new("view").args(["list", "path", "example"])))]
    Config {
        /// Show the effective configuration
        #[arg(long)]
        list: bool,
        /// Show the config file location
        #[arg(long)]
        path: bool,
        /// Print an example config file
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli_lib::logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Fatal error.");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        device_dir: cli.device_dir,
        scripts: cli.scripts,
    };

    match cli.command {
        // --list is the default view
        Some(Commands::Config { list, path, example }) => match (list, path, example) {
            (false, true, _) => cmd::config::run_path(cli.config.as_deref()),
            (false, false, true) => cmd::config::run_example(),
            _ => {
                let config = settings::resolve(cli.config.as_deref(), overrides)?;
                cmd::config::run_list(&config, cli.config.as_deref())
            }
        },
        Some(Commands::Scan) => {
            let config = settings::resolve(cli.config.as_deref(), overrides)?;
            cmd::scan::run(&config).await
        }
        None => {
            let config = settings::resolve(cli.config.as_deref(), overrides)?;
            cmd::watch::run(config).await
        }
    }
}
