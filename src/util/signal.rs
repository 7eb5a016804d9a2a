use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;
use tokio_stream::{StreamMap, StreamExt};
use tokio_stream::wrappers::SignalStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, error};

fn install_signal_handler<'a>(signals: &mut StreamMap<&'a str, SignalStream>, name: &'a str, sig_kind: SignalKind) -> Result<()>
{
    let sig = signal(sig_kind).with_context(|| format!("unable to install signal handler for {}", name))?;
    signals.insert(name, SignalStream::new(sig));
    Ok(())
}

/// Cancel `shutdown` on the first terminating signal.
/// If the monitor has not stopped a while later, the next signal aborts the process.
pub fn cancel_on_signal(shutdown: CancellationToken) -> Result<()>
{
    let mut signals = StreamMap::new();
    install_signal_handler(&mut signals, "SIGINT", SignalKind::interrupt())?;
    install_signal_handler(&mut signals, "SIGTERM", SignalKind::terminate())?;
    install_signal_handler(&mut signals, "SIGHUP", SignalKind::hangup())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            Some((sig, ())) = signals.next() =>
                info!("received {}, stopping monitor", sig),
            else => {
                error!("all signal streams are closed");
                return;
            }
        };
        shutdown.cancel();

        // a cycle may be stuck in a slow request; give it some time
        let delay = Duration::from_secs(10);
        loop {
            tokio::select! {
                _ = signals.next() => { /* too early, ignore */ }
                _ = sleep(delay) => break,
            };
        }
        warn!("shutdown is taking longer than expected, the next signal terminates the process");
        if let Some((sig, ())) = signals.next().await {
            warn!("received {}, aborting", sig);
            std::process::abort();
        }
    });

    Ok(())
}
