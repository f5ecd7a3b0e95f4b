pub mod config;
pub mod logging;

pub mod dispatch;
pub mod job;
pub mod joblog;
pub mod manifest;
pub mod progress;
pub mod report;
pub mod retry;
pub mod run;
pub mod transfer;
pub mod worker;
