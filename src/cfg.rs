use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use reqwest::Url;
use serde::Deserialize;


pub const REPORT_FILE: &str = "report.json";
pub const QUEUE_FILE: &str = "queue.json";


/// When the active outage queue is evaluated for escalation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationMode {
    /// Only after connectivity has been restored.
    #[default]
    OnRecovery,
    /// As soon as the ongoing outage reaches the threshold.
    /// The same outage is not reported again.
    Immediate,
}


#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file, relative to `DataDir` unless absolute.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Base title of reports, also used as subject of outage notifications.
    pub report_title: String,
    /// Name of the party that receives outage reports.
    #[serde(rename = "ISP", default)]
    pub isp: String,
    pub emails: EmailConfig,
    /// URL that is fetched to determine connectivity.
    pub check_host: String,
    /// Minutes between two probes.
    pub frequency: u64,
    /// Minimum outage duration, in minutes, that triggers a report.
    pub report_outage: u64,
    #[serde(default)]
    pub sendgrid_api_key: String,
    #[serde(default = "default_sendgrid_endpoint")]
    pub sendgrid_endpoint: String,
    /// Body of outage notifications.
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,
    /// Milliseconds. Successful probes slower than this are recorded as "slow".
    #[serde(default)]
    pub slow_threshold: Option<u64>,
    /// Minutes between two drains of the error channel.
    #[serde(default = "default_drain_interval")]
    pub drain_interval: u64,
    #[serde(default = "default_error_channel_capacity")]
    pub error_channel_capacity: usize,
    #[serde(default)]
    pub escalation: EscalationMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailConfig {
    /// Display name of the sender.
    pub from: String,
    pub from_mail: String,
    #[serde(default)]
    pub to_mails: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> PathBuf { PathBuf::from("ispmon.log") }
fn default_sendgrid_endpoint() -> String { "https://api.sendgrid.com/v3/mail/send".to_string() }
fn default_data_dir() -> PathBuf { PathBuf::from(".") }
fn default_probe_timeout() -> u64 { 5 }
fn default_drain_interval() -> u64 { 5 }
fn default_error_channel_capacity() -> usize { 100 }

impl Config {
    /// Read and validate the configuration file.
    pub fn load(path: &Path) -> Result<Self>
    {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read configuration file {:?}", path))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid configuration file {:?}", path))
    }

    pub fn from_json(content: &str) -> Result<Self>
    {
        let cfg: Config = serde_json::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()>
    {
        if self.report_title.is_empty() {
            bail!("ReportTitle must not be empty");
        }
        Url::parse(&self.check_host)
            .with_context(|| format!("CheckHost is not a valid URL: {:?}", self.check_host))?;
        if self.frequency == 0 {
            bail!("Frequency must be at least 1 minute");
        }
        if self.drain_interval == 0 {
            bail!("DrainInterval must be at least 1 minute");
        }
        if self.error_channel_capacity == 0 {
            bail!("ErrorChannelCapacity must be at least 1");
        }
        Ok(())
    }

    pub fn probe_interval(&self) -> Duration
    {
        Duration::from_secs(self.frequency.saturating_mul(60))
    }

    pub fn drain_interval(&self) -> Duration
    {
        Duration::from_secs(self.drain_interval.saturating_mul(60))
    }

    pub fn probe_timeout(&self) -> Duration
    {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn slow_threshold(&self) -> Option<Duration>
    {
        self.slow_threshold.map(Duration::from_millis)
    }

    /// Outages at least this long are reported.
    pub fn min_outage(&self) -> TimeDelta
    {
        i64::try_from(self.report_outage).ok()
            .and_then(TimeDelta::try_minutes)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn report_path(&self) -> PathBuf
    {
        self.data_dir.join(REPORT_FILE)
    }

    pub fn queue_path(&self) -> PathBuf
    {
        self.data_dir.join(QUEUE_FILE)
    }

    pub fn log_path(&self) -> PathBuf
    {
        self.data_dir.join(&self.log_file)
    }

    /// Tracing filter directive corresponding to `LogLevel`.
    pub fn log_filter(&self) -> &'static str
    {
        match self.log_level.to_ascii_lowercase().as_str() {
            "debug" => "debug",
            "warning" | "warn" => "warn",
            "error" | "critical" => "error",
            _ => "info",
        }
    }
}
