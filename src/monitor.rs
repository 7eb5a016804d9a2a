use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Level};
use uuid::Uuid;

use crate::cfg::{Config, EscalationMode};
use crate::escalation::{Escalation, EscalationError, Escalator};
use crate::notify::{Mailer, SendGridMailer};
use crate::outage::OutageState;
use crate::probe::{HttpProbe, Probe, ProbeError};
use crate::report::{Report, ReportEntry, ReportError, ReportStore, Status};


#[derive(Debug, Error)]
pub enum CycleError {
    #[error("host unreachable: {0}")]
    Probe(#[from] ProbeError),
    #[error("escalation failed: {0}")]
    Escalation(#[from] EscalationError),
    #[error("unable to record cycle: {0}")]
    Store(#[from] ReportError),
    /// Monitoring cannot continue; the process must stop.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CycleError {
    pub fn is_fatal(&self) -> bool
    {
        matches!(self, Self::Fatal(_))
    }

    pub fn level(&self) -> Level
    {
        match self {
            Self::Probe(_) => Level::WARN,
            Self::Escalation(_) | Self::Store(_) | Self::Fatal(_) => Level::ERROR,
        }
    }
}


/// Result of a cycle in which the host was reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub id: String,
    pub status: Status,
    pub escalation: Option<Escalation>,
}


pub struct Monitor {
    cfg: Arc<Config>,
    store: ReportStore,
    probe: Box<dyn Probe>,
    escalator: Escalator,
    // held for a whole cycle, so the report files have a single writer
    state: Mutex<OutageState>,
}

impl Monitor {
    pub async fn new(cfg: Arc<Config>, probe: Box<dyn Probe>, mailer: Arc<dyn Mailer>) -> Self
    {
        let store = ReportStore::new(&cfg.report_title);
        let queue = store.load(&cfg.queue_path()).await;
        let state = OutageState::from_queue(&queue);
        debug!(?state, "initial outage state");

        let escalator = Escalator::new(cfg.clone(), mailer);
        Self { cfg, store, probe, escalator, state: Mutex::new(state) }
    }

    /// Monitor probing and notifying over HTTP as configured.
    pub async fn from_config(cfg: Arc<Config>) -> anyhow::Result<Self>
    {
        let probe = HttpProbe::new(&cfg.check_host, cfg.probe_timeout())?;
        let mailer = SendGridMailer::from_config(&cfg)?;
        Ok(Self::new(cfg, Box::new(probe), Arc::new(mailer)).await)
    }

    pub fn config(&self) -> &Config
    {
        &self.cfg
    }

    pub async fn outage_state(&self) -> OutageState
    {
        *self.state.lock().await
    }

    /// Probe once, record the outcome and deal with the outage queue.
    pub async fn process_cycle(&self, now: DateTime<Utc>) -> Result<CycleOutcome, CycleError>
    {
        let mut state_guard = self.state.lock().await;
        let state = &mut *state_guard;

        self.ensure_data_dir().await?;

        let id = Uuid::new_v4().to_string();
        let probe_result = self.probe.check().await;

        let status = match &probe_result {
            Ok(latency) if self.cfg.slow_threshold().is_some_and(|max| *latency > max) => Status::Slow,
            Ok(_) => Status::Online,
            Err(_) => Status::Offline,
        };
        let recorded = self.append(&self.cfg.report_path(), ReportEntry::new(now, &id, status)).await;

        let probe_error = match probe_result {
            Ok(_) => {
                let escalation = self.escalator.evaluate(now).await?;
                if *state != OutageState::NoOutage {
                    info!("connectivity restored: {:?}", escalation);
                }
                state.resolved();
                recorded?;
                return Ok(CycleOutcome { id, status, escalation: Some(escalation) });
            }
            Err(e) => e,
        };

        if !state.is_queueing() {
            debug!("outage has already been reported, not queueing {}", id);
            recorded?;
            return Err(probe_error.into());
        }

        let queued = self.append(&self.cfg.queue_path(), ReportEntry::new(now, &id, Status::Offline)).await;
        state.probe_failed(now);

        // a lost entry outweighs the unreachable host
        recorded?;
        let queue = queued?;

        if self.cfg.escalation == EscalationMode::Immediate && queue.span() >= self.cfg.min_outage() {
            match self.escalator.evaluate(now).await {
                Ok(Escalation::Reported { .. }) => state.reported(now),
                Ok(_) => {}
                Err(e) => warn!("unable to report ongoing outage: {}", e),
            }
        }

        Err(probe_error.into())
    }

    /// Load the report at `path`, add `entry` and write it back.
    async fn append(&self, path: &Path, entry: ReportEntry) -> Result<Report, ReportError>
    {
        let mut report = self.store.load(path).await;
        report.push(entry);
        self.store.save(&mut report, path).await?;
        Ok(report)
    }

    async fn ensure_data_dir(&self) -> Result<(), CycleError>
    {
        tokio::fs::create_dir_all(&self.cfg.data_dir).await
            .map_err(|e| {
                let msg = format!("data directory {:?} is not usable: {}", self.cfg.data_dir, e);
                error!("{}", msg);
                CycleError::Fatal(msg)
            })
    }
}
