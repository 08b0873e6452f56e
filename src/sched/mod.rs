// src/sched/mod.rs

//! Live cron scheduling.
//!
//! - [`cron`] turns cron expression strings into [`::cron::Schedule`] values.
//! - [`scheduler`] owns the map from job identity to an active recurring
//!   trigger and is the only mutation surface for live scheduled work.

pub mod cron;
pub mod scheduler;

pub use cron::parse_schedule;
pub use scheduler::{ReloadReport, ScheduleError, Scheduler};
