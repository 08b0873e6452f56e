// src/sched/cron.rs

use std::str::FromStr;

use cron::Schedule;

use crate::sched::ScheduleError;

/// Parse a job's cron expression into a recurring schedule.
///
/// Jobs use the standard 5-field form (`minute hour day-of-month month
/// day-of-week`); a seconds field is prepended before handing the expression
/// to the `cron` crate, which expects it. Expressions that already carry a
/// seconds field (6 fields, or 7 with a year) are accepted as-is so that
/// sub-minute schedules remain expressible.
pub fn parse_schedule(expr: &str) -> Result<Schedule, ScheduleError> {
    let fields = expr.split_whitespace().count();
    let normalized = match fields {
        5 => format!("0 {}", expr.trim()),
        6 | 7 => expr.trim().to_string(),
        n => {
            return Err(ScheduleError::InvalidExpression {
                expr: expr.to_string(),
                reason: format!("expected 5 cron fields, got {n}"),
            });
        }
    };

    Schedule::from_str(&normalized).map_err(|err| ScheduleError::InvalidExpression {
        expr: expr.to_string(),
        reason: err.to_string(),
    })
}
