use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Options {
    /// Path of the JSON configuration file.
    #[arg(long, env = "ISPMON_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Options {
    /// Parse CLI options. Exit on failure.
    pub fn parse() -> Self
    {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Monitor connectivity until interrupted.
    Run,
    /// Run a single probe cycle and exit.
    Check,
    /// Inspect or reset the stored reports.
    Report(ReportOptions),
    /// Commands related to outage notifications.
    Notify(NotifyOptions),
}

#[derive(Parser, Debug)]
pub struct ReportOptions {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Print the entries of a report.
    Show(ReportShowOptions),
    /// Discard the outage that is currently being accumulated.
    ClearQueue,
}

#[derive(Parser, Debug)]
pub struct ReportShowOptions {
    /// Show the active outage queue instead of the running report.
    #[arg(long)]
    pub queue: bool,
    /// Only show the most recent entries.
    #[arg(long)]
    pub last: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct NotifyOptions {
    #[command(subcommand)]
    pub command: NotifyCommand,
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    /// Send a test notification to the configured recipients.
    Test,
}
