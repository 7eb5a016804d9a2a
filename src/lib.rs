//! Connectivity monitor: probes a host on a fixed interval, keeps a running
//! report of every probe and a queue of the current outage, and emails the
//! queue to the ISP once an outage has lasted long enough.

pub mod cfg;
pub mod escalation;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod outage;
pub mod probe;
pub mod report;
pub mod scheduler;

pub use cfg::Config;
pub use monitor::{CycleError, CycleOutcome, Monitor};
pub use scheduler::run;
