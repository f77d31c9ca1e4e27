use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Harvest new chapters and write the periodical bundle.
    Run(RunArgs),
    /// Validate the settings and list every novel with its cursor.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Settings file (JSON). Cursors are written back to it.
    #[arg(long)]
    pub config: String,

    /// Output directory for the bundle.
    #[arg(long)]
    pub out: String,

    /// Write the bundle but leave the cursors in the settings file untouched.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Settings file (JSON).
    #[arg(long)]
    pub config: String,
}
