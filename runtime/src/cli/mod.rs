//! Command-line surface of the urlsift binary.

pub mod config_cmd;
pub mod output;
pub mod scan_cmd;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use config_cmd::ConfigArgs;
use scan_cmd::ScanArgs;

#[derive(Parser, Debug)]
#[command(
    name = "urlsift",
    version,
    about = "Aggregate, probe and classify URLs for a target domain",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Scan flags, accepted without the `scan` subcommand
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover URLs for a domain, input file or target list
    Scan(ScanArgs),
    /// Store API keys, or show which are configured
    Config(ConfigArgs),
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Scan(args)) => scan_cmd::run(args).await,
        Some(Command::Config(args)) => config_cmd::run(args).await,
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "urlsift", &mut std::io::stdout());
            Ok(())
        }
        None => scan_cmd::run(cli.scan).await,
    }
}
