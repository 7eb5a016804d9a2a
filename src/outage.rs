use chrono::{DateTime, Utc};

use crate::report::Report;


/// Where the monitor stands with respect to the current outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutageState {
    NoOutage,
    /// Failed probes are being queued since `since`.
    Accumulating { since: DateTime<Utc> },
    /// The ongoing outage has already been reported at `at`.
    Escalated { at: DateTime<Utc> },
}

impl OutageState {
    /// State implied by the queue on disk, used at startup.
    pub fn from_queue(queue: &Report) -> Self
    {
        match queue.first_time() {
            Some(since) => Self::Accumulating { since },
            None => Self::NoOutage,
        }
    }

    /// Whether failed probes should currently be added to the queue.
    pub fn is_queueing(&self) -> bool
    {
        !matches!(self, Self::Escalated { .. })
    }

    pub fn probe_failed(&mut self, now: DateTime<Utc>)
    {
        if *self == Self::NoOutage {
            *self = Self::Accumulating { since: now };
        }
    }

    pub fn reported(&mut self, now: DateTime<Utc>)
    {
        *self = Self::Escalated { at: now };
    }

    /// Connectivity is back, or the queue has been dealt with.
    pub fn resolved(&mut self)
    {
        *self = Self::NoOutage;
    }
}


#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::report::{ReportEntry, Status};

    fn at(minute: u32) -> DateTime<Utc>
    {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn startup_state_follows_queue()
    {
        let mut queue = Report::empty("t");
        assert_eq!(OutageState::from_queue(&queue), OutageState::NoOutage);

        queue.push(ReportEntry::new(at(3), "a", Status::Offline));
        queue.push(ReportEntry::new(at(4), "b", Status::Offline));
        assert_eq!(OutageState::from_queue(&queue), OutageState::Accumulating { since: at(3) });
    }

    #[test]
    fn outage_lifecycle()
    {
        let mut state = OutageState::NoOutage;
        state.probe_failed(at(0));
        assert_eq!(state, OutageState::Accumulating { since: at(0) });

        // further failures keep the start of the outage
        state.probe_failed(at(1));
        assert_eq!(state, OutageState::Accumulating { since: at(0) });
        assert!(state.is_queueing());

        state.reported(at(5));
        assert_eq!(state, OutageState::Escalated { at: at(5) });
        assert!(!state.is_queueing());
        state.probe_failed(at(6));
        assert_eq!(state, OutageState::Escalated { at: at(5) });

        state.resolved();
        assert_eq!(state, OutageState::NoOutage);
    }
}
