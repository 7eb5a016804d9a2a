use std::sync::Arc;

use anyhow::Result;
use ispmon::{Config, Monitor};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::util::signal::cancel_on_signal;

pub async fn execute_command(cfg: Config) -> Result<()>
{
    let cfg = Arc::new(cfg);
    let monitor = Arc::new(Monitor::from_config(cfg).await?);
    info!("initial outage state: {:?}", monitor.outage_state().await);

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone())?;

    ispmon::run(monitor, shutdown).await?;

    info!("Done. Exiting");
    Ok(())
}
