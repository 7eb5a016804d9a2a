use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use tracing::{debug, error, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Offline,
    Slow,
}

impl Status {
    pub fn as_str(self) -> &'static str
    {
        match self {
            Status::Online => "online",
            Status::Offline => "offline",
            Status::Slow => "slow",
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    /// Correlates the entries written by the same cycle.
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: Status,
}

impl ReportEntry {
    pub fn new(time: DateTime<Utc>, id: &str, status: Status) -> Self
    {
        Self { time, id: id.to_string(), status }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    pub title: String,
    #[serde(default)]
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn empty(title: &str) -> Self
    {
        Self { title: title.to_string(), entries: Vec::new() }
    }

    pub fn push(&mut self, entry: ReportEntry)
    {
        self.entries.push(entry);
    }

    pub fn first_time(&self) -> Option<DateTime<Utc>>
    {
        self.entries.first().map(|e| e.time)
    }

    /// Time between the first and the last entry; zero for fewer than two entries.
    pub fn span(&self) -> TimeDelta
    {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => TimeDelta::zero(),
        }
    }
}


#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unable to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unable to write {path}: {source}")]
    Write { path: String, source: std::io::Error },
}


/// Human-readable rendering of a duration, without sub-second precision.
pub fn format_span(span: TimeDelta) -> String
{
    let secs = span.num_seconds().max(0).unsigned_abs();
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}


/// Reads and writes reports as JSON files.
///
/// The file is the only source of truth: nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct ReportStore {
    base_title: String,
}

impl ReportStore {
    pub fn new(base_title: &str) -> Self
    {
        Self { base_title: base_title.to_string() }
    }

    pub fn base_title(&self) -> &str
    {
        &self.base_title
    }

    /// Load the report stored at `path`.
    /// A missing, unreadable or malformed file yields an empty report.
    pub async fn load(&self, path: &Path) -> Report
    {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no report at {:?}, starting empty", path);
                return Report::empty(&self.base_title);
            }
            Err(e) => {
                warn!("unable to read report {:?}: {}", path, e);
                return Report::empty(&self.base_title);
            }
        };

        match serde_json::from_slice::<Report>(&content) {
            Ok(report) => report,
            Err(e) => {
                warn!("malformed report {:?}, starting empty: {}", path, e);
                Report::empty(&self.base_title)
            }
        }
    }

    /// Recompute the title of `report` and write it to `path`.
    pub async fn save(&self, report: &mut Report, path: &Path) -> Result<(), ReportError>
    {
        report.title = self.title_for(report);

        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        report.serialize(&mut ser)
            .inspect_err(|e| error!("unable to serialize report for {:?}: {}", path, e))?;

        tokio::fs::write(path, &out).await
            .map_err(|source| {
                error!("unable to write report {:?}: {}", path, source);
                ReportError::Write { path: path.display().to_string(), source }
            })
    }

    /// Reset the report at `path` to zero entries.
    pub async fn clear(&self, path: &Path) -> Result<(), ReportError>
    {
        let mut report = self.load(path).await;
        report.entries.clear();
        self.save(&mut report, path).await
    }

    fn title_for(&self, report: &Report) -> String
    {
        if report.entries.len() < 2 {
            return self.base_title.clone();
        }
        format!("{} - Offline for {}", self.base_title, format_span(report.span()))
    }
}
