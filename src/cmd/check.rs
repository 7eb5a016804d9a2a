use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use ispmon::escalation::Escalation;
use ispmon::report::format_span;
use ispmon::{Config, CycleError, Monitor};

pub async fn execute_command(cfg: Config) -> Result<()>
{
    let monitor = Monitor::from_config(Arc::new(cfg)).await?;

    match monitor.process_cycle(Utc::now()).await {
        Ok(outcome) => {
            println!("{} ({})", outcome.status.as_str(), outcome.id);
            match outcome.escalation {
                Some(Escalation::Dismissed { duration }) =>
                    println!("previous outage of {} was too short to report", format_span(duration)),
                Some(Escalation::Reported { duration, response }) =>
                    println!("reported outage of {} (status {})", format_span(duration), response),
                Some(Escalation::Idle) | None => (),
            }
            Ok(())
        }
        Err(e @ CycleError::Probe(_)) => {
            println!("offline: {}", e);
            println!("outage state: {:?}", monitor.outage_state().await);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
