pub mod check;
pub mod notify;
pub mod report;
pub mod run;
