use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cfg::Config;
use crate::notify::{Mailer, Notification, NotifyError};
use crate::report::{format_span, ReportError, ReportStore};


#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("unable to snapshot outage queue: {0}")]
    Snapshot(std::io::Error),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("unable to reset outage queue: {0}")]
    Clear(#[from] ReportError),
}


/// What `evaluate` did with the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    /// The queue was empty.
    Idle,
    /// The outage was too short to report; the queue was cleared.
    Dismissed { duration: TimeDelta },
    /// The outage was reported and the queue was cleared.
    Reported { duration: TimeDelta, response: String },
}


/// Decides whether the active outage queue is reported, and reports it.
pub struct Escalator {
    cfg: Arc<Config>,
    store: ReportStore,
    mailer: Arc<dyn Mailer>,
}

impl Escalator {
    pub fn new(cfg: Arc<Config>, mailer: Arc<dyn Mailer>) -> Self
    {
        let store = ReportStore::new(&cfg.report_title);
        Self { cfg, store, mailer }
    }

    pub async fn evaluate(&self, now: DateTime<Utc>) -> Result<Escalation, EscalationError>
    {
        let queue_path = self.cfg.queue_path();
        let queue = self.store.load(&queue_path).await;
        if queue.entries.is_empty() {
            return Ok(Escalation::Idle);
        }

        let duration = queue.span();
        if duration < self.cfg.min_outage() {
            debug!("outage of {} is below the reporting threshold", format_span(duration));
            self.store.clear(&queue_path).await?;
            return Ok(Escalation::Dismissed { duration });
        }

        info!("reporting outage of {} ({} entries)", format_span(duration), queue.entries.len());

        let snapshot = snapshot_path(&self.cfg.data_dir, now);
        tokio::fs::copy(&queue_path, &snapshot).await
            .map_err(|e| {
                error!("unable to snapshot {:?} to {:?}: {}", queue_path, snapshot, e);
                EscalationError::Snapshot(e)
            })?;

        let notification = Notification::from_config(&self.cfg)
            .with_attachment(snapshot.clone());
        let sent = self.mailer.send(&notification).await;

        if let Err(e) = tokio::fs::remove_file(&snapshot).await {
            warn!("unable to remove snapshot {:?}: {}", snapshot, e);
        }

        // on failure the queue is kept, so the next evaluation tries again
        let response = sent?;
        self.store.clear(&queue_path).await?;

        Ok(Escalation::Reported { duration, response })
    }
}

/// Path of the file that is attached to the report sent at `now`.
pub fn snapshot_path(data_dir: &Path, now: DateTime<Utc>) -> PathBuf
{
    data_dir.join(format!("OutageReport-{}.json", now.format("%Y-%m-%d %H.%M.%S")))
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::cfg::tests::LEGACY_CONFIG;
    use crate::report::{Report, ReportEntry, Status};

    #[derive(Default)]
    struct RecordingMailer {
        fail: bool,
        sent: Mutex<Vec<(Notification, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, n: &Notification) -> Result<String, NotifyError>
        {
            let path = n.attachment.as_ref().expect("outage reports carry an attachment");
            let content = std::fs::read_to_string(path).expect("attachment exists while sending");
            self.sent.lock().unwrap().push((n.clone(), content));
            if self.fail {
                return Err(NotifyError::Rejected { status: reqwest::StatusCode::BAD_GATEWAY, body: String::new() });
            }
            Ok("202".to_string())
        }
    }

    fn at(minute: u32) -> DateTime<Utc>
    {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        cfg: Arc<Config>,
        store: ReportStore,
        mailer: Arc<RecordingMailer>,
        escalator: Escalator,
    }

    fn fixture(fail: bool) -> Fixture
    {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::from_json(LEGACY_CONFIG).unwrap();
        cfg.data_dir = dir.path().to_path_buf();
        let cfg = Arc::new(cfg);
        let mailer = Arc::new(RecordingMailer { fail, ..Default::default() });
        let escalator = Escalator::new(cfg.clone(), mailer.clone());
        let store = ReportStore::new(&cfg.report_title);
        Fixture { _dir: dir, cfg, store, mailer, escalator }
    }

    async fn queue_outage(f: &Fixture, minutes: &[u32])
    {
        let mut queue = Report::empty(&f.cfg.report_title);
        for &m in minutes {
            queue.push(ReportEntry::new(at(m), &format!("cycle-{m}"), Status::Offline));
        }
        f.store.save(&mut queue, &f.cfg.queue_path()).await.unwrap();
    }

    fn files_in_data_dir(f: &Fixture) -> Vec<String>
    {
        let mut names: Vec<String> = std::fs::read_dir(&f.cfg.data_dir).unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn empty_queue_is_idle()
    {
        let f = fixture(false);
        assert_eq!(f.escalator.evaluate(at(10)).await.unwrap(), Escalation::Idle);
        assert!(f.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_outage_is_dismissed()
    {
        let f = fixture(false);
        queue_outage(&f, &[0, 1, 2, 3, 4]).await;

        let result = f.escalator.evaluate(at(5)).await.unwrap();
        assert_eq!(result, Escalation::Dismissed { duration: TimeDelta::minutes(4) });
        assert!(f.mailer.sent.lock().unwrap().is_empty());
        assert_eq!(f.store.load(&f.cfg.queue_path()).await, Report::empty(&f.cfg.report_title));
    }

    #[tokio::test]
    async fn outage_at_threshold_is_reported()
    {
        let f = fixture(false);
        queue_outage(&f, &[0, 1, 2, 3, 4, 5]).await;
        let queued = std::fs::read_to_string(f.cfg.queue_path()).unwrap();

        let result = f.escalator.evaluate(at(6)).await.unwrap();
        assert_eq!(result, Escalation::Reported { duration: TimeDelta::minutes(5), response: "202".to_string() });

        let sent = f.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (n, attached) = &sent[0];
        assert_eq!(n.subject, "Internet Outage");
        assert_eq!(n.plaintext, "Our connection was down.");
        assert_eq!(n.to, "Example ISP");
        assert_eq!(n.attachment.as_deref(), Some(snapshot_path(&f.cfg.data_dir, at(6)).as_path()));
        assert_eq!(attached, &queued);
        drop(sent);

        assert!(f.store.load(&f.cfg.queue_path()).await.entries.is_empty());
        assert_eq!(files_in_data_dir(&f), vec!["queue.json".to_string()]);
    }

    #[tokio::test]
    async fn failed_send_keeps_queue()
    {
        let f = fixture(true);
        queue_outage(&f, &[0, 10]).await;

        let err = f.escalator.evaluate(at(11)).await.unwrap_err();
        assert!(matches!(err, EscalationError::Notify(NotifyError::Rejected { .. })));
        assert_eq!(f.mailer.sent.lock().unwrap().len(), 1);
        assert_eq!(f.store.load(&f.cfg.queue_path()).await.entries.len(), 2);
        // snapshot is gone even though sending failed
        assert_eq!(files_in_data_dir(&f), vec!["queue.json".to_string()]);
    }

    #[test]
    fn snapshot_name_embeds_timestamp()
    {
        let path = snapshot_path(Path::new("/data"), at(5));
        assert_eq!(path, PathBuf::from("/data/OutageReport-2026-03-01 12.05.00.json"));
    }
}
