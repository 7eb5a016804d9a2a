use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};

use crate::monitor::{CycleError, Monitor};


/// Producer side of the bounded error channel.
///
/// Reporting never waits: when the channel is full the new error is dropped
/// (after being logged here), and older, still undrained errors are kept.
#[derive(Debug)]
pub struct ErrorReporter {
    tx: Sender<CycleError>,
    dropped: AtomicU64,
}

pub fn error_channel(capacity: usize) -> (ErrorReporter, Receiver<CycleError>)
{
    let (tx, rx) = mpsc::channel(capacity);
    (ErrorReporter { tx, dropped: AtomicU64::new(0) }, rx)
}

impl ErrorReporter {
    /// Returns whether the error was queued.
    pub fn report(&self, err: CycleError) -> bool
    {
        match self.tx.try_send(err) {
            Ok(()) => true,
            Err(TrySendError::Full(err)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("error channel is full, dropping: {}", err);
                false
            }
            Err(TrySendError::Closed(err)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("error channel is closed, dropping: {}", err);
                false
            }
        }
    }

    pub fn dropped(&self) -> u64
    {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub fn log_cycle_error(err: &CycleError)
{
    if err.level() == Level::WARN {
        warn!("cycle failed: {}", err);
    } else {
        error!("cycle failed: {}", err);
    }
}

/// Log every error currently waiting in the channel.
pub fn drain_errors(errors_rx: &mut Receiver<CycleError>) -> usize
{
    let mut count = 0;
    while let Ok(err) = errors_rx.try_recv() {
        log_cycle_error(&err);
        count += 1;
    }
    count
}


/// Run the monitor until `shutdown` is cancelled or a cycle fails fatally.
pub async fn run(monitor: Arc<Monitor>, shutdown: CancellationToken) -> Result<()>
{
    let cfg = monitor.config();
    let probe_interval = cfg.probe_interval();
    let drain_interval = cfg.drain_interval();
    let (reporter, errors_rx) = error_channel(cfg.error_channel_capacity);

    info!(
        "monitoring {} every {}, draining errors every {}",
        cfg.check_host,
        humantime::Duration::from(probe_interval),
        humantime::Duration::from(drain_interval),
    );

    let drain_task = tokio::spawn(drain_loop(errors_rx, drain_interval, shutdown.clone()));

    let result = cycle_loop(&monitor, &reporter, probe_interval, &shutdown).await;

    shutdown.cancel();
    if let Err(e) = drain_task.await {
        error!("error drain task failed: {}", e);
    }
    if reporter.dropped() > 0 {
        warn!("{} errors were dropped because the error channel was full", reporter.dropped());
    }

    result
}

async fn cycle_loop(monitor: &Monitor, reporter: &ErrorReporter, interval: Duration, shutdown: &CancellationToken) -> Result<()>
{
    loop {
        match monitor.process_cycle(Utc::now()).await {
            Ok(outcome) => debug!(?outcome, "cycle completed"),
            Err(e) if e.is_fatal() => {
                error!("stopping: {}", e);
                return Err(e.into());
            }
            Err(e) => {
                reporter.report(e);
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(interval) => (),
        };
    }
    debug!("cycle loop stopped");
    Ok(())
}

async fn drain_loop(mut errors_rx: Receiver<CycleError>, interval: Duration, shutdown: CancellationToken)
{
    loop {
        drain_errors(&mut errors_rx);

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(interval) => (),
        };
    }
    // pick up whatever the cycle loop reported last
    drain_errors(&mut errors_rx);
    debug!("error drain stopped");
}
