use anyhow::{Context, Result};
use cli::{Command, Options};
use ispmon::Config;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod cmd;
mod util;

#[tokio::main]
async fn main() -> Result<()>
{
    let options = Options::parse();

    // a missing or invalid configuration ends the process with a non-zero status
    let cfg = Config::load(&options.config)?;

    setup_tracing(&cfg)?;
    debug!(?options);

    match &options.command {
        Command::Run =>
            cmd::run::execute_command(cfg).await,
        Command::Check =>
            cmd::check::execute_command(cfg).await,
        Command::Report(report_options) =>
            cmd::report::execute_command(&cfg, report_options).await,
        Command::Notify(notify_options) =>
            cmd::notify::execute_command(&cfg, notify_options).await,
    }
}

fn setup_tracing(cfg: &Config) -> Result<()>
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_filter()));

    std::fs::create_dir_all(&cfg.data_dir)
        .with_context(|| format!("unable to create data directory {:?}", cfg.data_dir))?;
    let log_path = cfg.log_path();
    let file_layer = ispmon::logging::file_layer(&log_path)
        .with_context(|| format!("unable to open log file {:?}", log_path))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_thread_ids(true))
        .with(file_layer)
        .init();
    Ok(())
}
